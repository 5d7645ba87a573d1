use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Instructions the deployed program must expose for the portal to work.
pub const REQUIRED_INSTRUCTIONS: [&str; 2] = ["initialize_account", "append_item"];

/// The program interface descriptor, generated when the program is deployed
/// and baked into the portal at build time.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramDescriptor {
    pub name: String,
    pub version: String,
    pub program_id: String,
    pub instructions: Vec<InstructionDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstructionDescriptor {
    pub name: String,
}

impl ProgramDescriptor {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read program descriptor: {}", path.display()))?;
        let descriptor: Self = serde_json::from_str(&contents)
            .with_context(|| format!("invalid program descriptor: {}", path.display()))?;

        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn supports(&self, instruction: &str) -> bool {
        self.instructions
            .iter()
            .any(|candidate| candidate.name == instruction)
    }

    fn validate(&self) -> Result<()> {
        if self.program_id.trim().is_empty() {
            bail!("program descriptor is missing a program id");
        }

        for required in REQUIRED_INSTRUCTIONS {
            if !self.supports(required) {
                bail!("program descriptor does not list instruction '{required}'");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_descriptor(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("program-descriptor.json");
        std::fs::write(&path, contents).expect("write descriptor");
        (dir, path)
    }

    #[test]
    fn complete_descriptor_loads() {
        let (_dir, path) = write_descriptor(
            r#"{
                "name": "gifportal",
                "version": "0.1.0",
                "program_id": "portal1",
                "instructions": [
                    {"name": "initialize_account"},
                    {"name": "append_item"}
                ]
            }"#,
        );

        let descriptor = ProgramDescriptor::from_file(&path).expect("load");
        assert_eq!(descriptor.program_id, "portal1");
        assert!(descriptor.supports("append_item"));
        assert!(!descriptor.supports("close_account"));
    }

    #[test]
    fn descriptor_missing_an_instruction_is_rejected() {
        let (_dir, path) = write_descriptor(
            r#"{
                "name": "gifportal",
                "version": "0.1.0",
                "program_id": "portal1",
                "instructions": [{"name": "initialize_account"}]
            }"#,
        );

        let err = ProgramDescriptor::from_file(&path).expect_err("should reject");
        assert!(err.to_string().contains("append_item"));
    }

    #[test]
    fn descriptor_with_blank_program_id_is_rejected() {
        let (_dir, path) = write_descriptor(
            r#"{
                "name": "gifportal",
                "version": "0.1.0",
                "program_id": " ",
                "instructions": [
                    {"name": "initialize_account"},
                    {"name": "append_item"}
                ]
            }"#,
        );

        assert!(ProgramDescriptor::from_file(&path).is_err());
    }
}
