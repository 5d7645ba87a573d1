use anyhow::{Context, Result, anyhow};
use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier};
use gp_api_types::{AccountAddress, SignPurpose};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use zeroize::Zeroize;

/// Full key material for the shared list account.
///
/// The account address is derived from the public key; on-chain creation of
/// the account requires a signature from this key, not merely from the
/// invoking user's wallet.
#[derive(Clone)]
pub struct AccountKeys {
    signing_key: SigningKey,
}

impl AccountKeys {
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        to_hex(&self.public_key_bytes())
    }

    pub fn address(&self) -> AccountAddress {
        let digest = Sha256::digest(self.public_key_bytes());
        AccountAddress(format!("0x{}", to_hex(&digest[..20])))
    }

    pub fn sign(&self, payload: &[u8], purpose: SignPurpose) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(anyhow!("payload cannot be empty"));
        }

        let signature: Signature = self.signing_key.sign(&signing_input(payload, purpose));
        Ok(signature.to_bytes().to_vec())
    }

    pub fn verify(&self, payload: &[u8], purpose: SignPurpose, signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };

        self.signing_key
            .verifying_key()
            .verify(&signing_input(payload, purpose), &signature)
            .is_ok()
    }

    pub fn to_keypair_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }

    pub fn from_keypair_bytes(bytes: &[u8; 64]) -> Result<Self> {
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|err| anyhow!("invalid keypair bytes: {err}"))?;
        Ok(Self { signing_key })
    }

    /// Write the keypair artifact: a JSON array of the 64 keypair bytes.
    pub fn save_keypair_file(&self, path: &Path) -> Result<()> {
        let mut bytes = self.to_keypair_bytes().to_vec();
        let encoded = serde_json::to_string(&bytes)?;
        bytes.zeroize();
        fs::write(path, encoded)
            .with_context(|| format!("failed to write keypair file: {}", path.display()))?;
        Ok(())
    }

    pub fn load_keypair_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read keypair file: {}", path.display()))?;
        let mut bytes: Vec<u8> = serde_json::from_str(&contents)
            .with_context(|| format!("keypair file is not a JSON byte array: {}", path.display()))?;

        if bytes.len() != 64 {
            bytes.zeroize();
            return Err(anyhow!("keypair file must hold exactly 64 bytes"));
        }

        let mut fixed = [0_u8; 64];
        fixed.copy_from_slice(&bytes);
        bytes.zeroize();

        let keys = Self::from_keypair_bytes(&fixed);
        fixed.zeroize();
        keys
    }
}

fn signing_input(payload: &[u8], purpose: SignPurpose) -> Vec<u8> {
    let purpose_tag = match purpose {
        SignPurpose::InitializeAccount => "init",
        SignPurpose::AppendItem => "append",
    };

    let mut input = Vec::with_capacity(32 + payload.len());
    input.extend_from_slice(b"gifportal:v1:");
    input.extend_from_slice(purpose_tag.as_bytes());
    input.extend_from_slice(b":");
    input.extend_from_slice(payload);
    input
}

pub fn to_hex(input: &[u8]) -> String {
    let mut output = String::with_capacity(input.len() * 2);
    for byte in input {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
