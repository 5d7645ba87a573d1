use async_trait::async_trait;
use gp_api_types::AccountAddress;
use gp_keys::AccountKeys;
use gp_wallet::{SessionError, WalletProvider};
use std::sync::atomic::{AtomicBool, Ordering};

/// Custodial stand-in for a browser-injected wallet: the service holds its
/// own signer, so an explicit connect always succeeds. Trust is established
/// per process — the first silent probe after startup is declined, the same
/// way a fresh browser session would be.
pub(crate) struct HostedProvider {
    keys: AccountKeys,
    trusted: AtomicBool,
}

impl HostedProvider {
    pub(crate) fn new() -> Self {
        Self {
            keys: AccountKeys::generate(),
            trusted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl WalletProvider for HostedProvider {
    fn is_supported(&self) -> bool {
        true
    }

    async fn connect(&self, only_if_trusted: bool) -> Result<AccountAddress, SessionError> {
        if only_if_trusted && !self.trusted.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected("no trusted session".to_owned()));
        }

        self.trusted.store(true, Ordering::SeqCst);
        Ok(self.keys.address())
    }
}
