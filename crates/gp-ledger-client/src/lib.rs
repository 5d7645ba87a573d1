use async_trait::async_trait;
use gp_api_types::{AccountAddress, ItemRecord};
use gp_keys::AccountKeys;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{trace, warn};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("ledger returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("failed to decode ledger response: {0}")]
    Decode(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("ledger call timed out after {0}ms")]
    Timeout(u64),
}

/// Result of reading the list account. `NotFound` means the account was
/// never initialized — a legitimate state, distinct from every failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Vec<ItemRecord>),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyExists,
}

/// The remote program holding the shared list, behind one fixed account
/// address. Account creation must be signed by the account's own key.
#[async_trait]
pub trait LedgerProgram: Send + Sync {
    async fn fetch_account(&self, address: &AccountAddress) -> Result<FetchOutcome, LedgerError>;

    async fn initialize_account(
        &self,
        address: &AccountAddress,
        keys: &AccountKeys,
    ) -> Result<InitOutcome, LedgerError>;

    async fn append_item(
        &self,
        address: &AccountAddress,
        record: ItemRecord,
    ) -> Result<(), LedgerError>;
}

/// Configuration for the list client. Passed in at construction — nothing
/// here is read from ambient state.
#[derive(Clone)]
pub struct ListConfig {
    pub account: AccountAddress,
    pub keys: AccountKeys,
    pub request_timeout: Duration,
}

impl ListConfig {
    pub fn new(keys: AccountKeys) -> Self {
        Self {
            account: keys.address(),
            keys,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Client for the one fixed list account: fetch, one-time initialize,
/// append. Every call has a bounded wait.
pub struct ListClient {
    program: Arc<dyn LedgerProgram>,
    config: ListConfig,
}

impl ListClient {
    pub fn new(program: Arc<dyn LedgerProgram>, config: ListConfig) -> Self {
        Self { program, config }
    }

    pub fn account(&self) -> &AccountAddress {
        &self.config.account
    }

    pub async fn fetch_items(&self) -> Result<FetchOutcome, LedgerError> {
        self.bounded(self.program.fetch_account(&self.config.account))
            .await
    }

    pub async fn initialize_account(&self) -> Result<InitOutcome, LedgerError> {
        let outcome = self
            .bounded(
                self.program
                    .initialize_account(&self.config.account, &self.config.keys),
            )
            .await?;

        if outcome == InitOutcome::AlreadyExists {
            warn!(
                "list account {} already initialized; treating as success",
                self.config.account.0
            );
        }

        Ok(outcome)
    }

    pub async fn append_item(
        &self,
        link: &str,
        submitter: Option<AccountAddress>,
    ) -> Result<(), LedgerError> {
        let link = link.trim();
        if link.is_empty() {
            trace!("rejecting empty link before any remote call");
            return Err(LedgerError::InvalidInput("link must not be empty"));
        }

        let record = ItemRecord::new(link, submitter);
        self.bounded(self.program.append_item(&self.config.account, record))
            .await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout(
                self.config.request_timeout.as_millis() as u64,
            )),
        }
    }
}

/// In-process ledger used by tests and local runs.
#[derive(Default)]
pub struct InMemoryLedger {
    accounts: RwLock<HashMap<AccountAddress, Vec<ItemRecord>>>,
}

#[async_trait]
impl LedgerProgram for InMemoryLedger {
    async fn fetch_account(&self, address: &AccountAddress) -> Result<FetchOutcome, LedgerError> {
        let accounts = self.accounts.read().await;
        Ok(match accounts.get(address) {
            Some(items) => FetchOutcome::Found(items.clone()),
            None => FetchOutcome::NotFound,
        })
    }

    async fn initialize_account(
        &self,
        address: &AccountAddress,
        keys: &AccountKeys,
    ) -> Result<InitOutcome, LedgerError> {
        if keys.address() != *address {
            return Err(LedgerError::Status {
                code: 403,
                message: "creation must be signed by the account itself".to_owned(),
            });
        }

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(address) {
            return Ok(InitOutcome::AlreadyExists);
        }

        accounts.insert(address.clone(), Vec::new());
        Ok(InitOutcome::Created)
    }

    async fn append_item(
        &self,
        address: &AccountAddress,
        record: ItemRecord,
    ) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().await;
        let Some(items) = accounts.get_mut(address) else {
            return Err(LedgerError::Status {
                code: 404,
                message: "account not initialized".to_owned(),
            });
        };

        items.push(record);
        Ok(())
    }
}
