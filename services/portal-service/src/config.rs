use std::path::PathBuf;

/// Runtime configuration, read from the environment once at startup.
/// Everything downstream receives these values explicitly.
pub(crate) struct ServiceConfig {
    pub(crate) bind_addr: String,
    pub(crate) ledger_url: String,
    pub(crate) descriptor_path: PathBuf,
    pub(crate) keypair_path: PathBuf,
    pub(crate) local_ledger: bool,
    pub(crate) hosted_wallet: bool,
    pub(crate) network: String,
    pub(crate) community_link: String,
}

impl ServiceConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            bind_addr: env_or("PORTAL_BIND_ADDR", "0.0.0.0:8080"),
            ledger_url: env_or("PORTAL_LEDGER_URL", "http://localhost:8899"),
            descriptor_path: PathBuf::from(env_or(
                "PORTAL_DESCRIPTOR_PATH",
                "program-descriptor.json",
            )),
            keypair_path: PathBuf::from(env_or("PORTAL_KEYPAIR_PATH", "account-keypair.json")),
            local_ledger: env_flag("PORTAL_LOCAL_LEDGER"),
            hosted_wallet: !env_flag("PORTAL_NO_WALLET"),
            network: env_or("PORTAL_NETWORK", "devnet"),
            community_link: env_or("PORTAL_COMMUNITY_LINK", "https://twitter.com/gifportal"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}
