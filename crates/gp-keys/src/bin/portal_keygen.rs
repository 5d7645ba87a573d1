use anyhow::{Result, anyhow};
use gp_keys::AccountKeys;
use std::path::PathBuf;

/// Generates the shared list account's keypair artifact.
///
/// The artifact is generated once at build time and baked into a deployed
/// portal instance; every user of that instance shares the account it
/// derives. Refuses to overwrite an existing file.
fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("account-keypair.json"));

    if path.exists() {
        return Err(anyhow!(
            "{} already exists; refusing to overwrite a deployed account keypair",
            path.display()
        ));
    }

    let keys = AccountKeys::generate();
    keys.save_keypair_file(&path)?;

    println!("wrote {}", path.display());
    println!("account address: {}", keys.address().0);
    Ok(())
}
