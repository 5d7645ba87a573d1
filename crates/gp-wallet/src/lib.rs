use async_trait::async_trait;
use gp_api_types::AccountAddress;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("wallet capability not found")]
    CapabilityAbsent,

    #[error("wallet connection rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Unknown,
    Disconnected,
    Connected(AccountAddress),
}

impl SessionStatus {
    pub fn connected_address(&self) -> Option<&AccountAddress> {
        match self {
            SessionStatus::Connected(address) => Some(address),
            _ => None,
        }
    }
}

/// The wallet capability injected by the host environment.
///
/// `connect(true)` is the silent probe: it resolves only if a trust
/// relationship was previously established, without prompting the user.
/// `connect(false)` may raise the capability's own UI and must only be
/// invoked from a direct user action.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// The provider-identity flag: an injected object that is not the
    /// expected provider is treated the same as no capability at all.
    fn is_supported(&self) -> bool;

    async fn connect(&self, only_if_trusted: bool) -> Result<AccountAddress, SessionError>;
}

type ConnectedHook =
    Box<dyn Fn(AccountAddress) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Tracks the wallet session for one process lifetime.
///
/// Capability absence is a first-class state: construct with `None` and the
/// silent probe degrades while the explicit connect reports it. `Connected`
/// is terminal — no disconnect is exposed. The registered on-connected hook
/// is invoked directly on every transition into `Connected`, exactly once
/// per transition.
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    status: RwLock<SessionStatus>,
    on_connected: Option<ConnectedHook>,
}

impl SessionManager {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            status: RwLock::new(SessionStatus::Unknown),
            on_connected: None,
        }
    }

    pub fn on_connected<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(AccountAddress) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_connected = Some(Box::new(move |address| Box::pin(hook(address))));
        self
    }

    pub async fn status(&self) -> SessionStatus {
        self.status.read().await.clone()
    }

    /// Non-interactive connection attempt. Never an error to the caller:
    /// absence, an unsupported provider, and a declined probe all resolve
    /// to `Disconnected`.
    pub async fn probe_silent(&self) -> SessionStatus {
        if let SessionStatus::Connected(address) = self.status().await {
            return SessionStatus::Connected(address);
        }

        let Some(provider) = self.usable_provider() else {
            self.set_status(SessionStatus::Disconnected).await;
            return SessionStatus::Disconnected;
        };

        match provider.connect(true).await {
            Ok(address) => {
                info!("silent probe connected with address {}", address.0);
                self.transition_connected(address.clone()).await;
                SessionStatus::Connected(address)
            }
            Err(err) => {
                info!("silent probe declined: {err}");
                self.set_status(SessionStatus::Disconnected).await;
                SessionStatus::Disconnected
            }
        }
    }

    /// Interactive connection attempt. A wholly absent capability surfaces
    /// as `CapabilityAbsent` so the caller can show a notice, unlike the
    /// probe's silent degradation.
    pub async fn connect_explicit(&self) -> Result<AccountAddress, SessionError> {
        if let SessionStatus::Connected(address) = self.status().await {
            return Ok(address);
        }

        let Some(provider) = self.usable_provider() else {
            return Err(SessionError::CapabilityAbsent);
        };

        let address = provider.connect(false).await?;
        info!("connected with address {}", address.0);
        self.transition_connected(address.clone()).await;
        Ok(address)
    }

    fn usable_provider(&self) -> Option<Arc<dyn WalletProvider>> {
        let Some(provider) = &self.provider else {
            warn!("wallet capability not found");
            return None;
        };

        if !provider.is_supported() {
            warn!("injected wallet is not a supported provider");
            return None;
        }

        Some(provider.clone())
    }

    async fn set_status(&self, status: SessionStatus) {
        *self.status.write().await = status;
    }

    async fn transition_connected(&self, address: AccountAddress) {
        self.set_status(SessionStatus::Connected(address.clone())).await;
        if let Some(hook) = &self.on_connected {
            hook(address).await;
        }
    }
}
