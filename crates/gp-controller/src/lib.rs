use gp_api_types::{AccountAddress, ItemRecord, UiState};
use gp_ledger_client::{FetchOutcome, LedgerError, ListClient};
use gp_wallet::{SessionError, SessionManager, SessionStatus, WalletProvider};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{trace, warn};

#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("no wallet session is connected")]
    NotConnected,
}

/// Last applied fetch result. A failed fetch never modifies this —
/// stale-but-present beats cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    NoneYet,
    NotFound,
    Ready(Vec<ItemRecord>),
}

/// Pure derivation of the presented view from session and fetch state.
///
/// The session gates everything; `NotFound` and only `NotFound` selects the
/// initialize prompt; a connected session with no successful fetch yet keeps
/// presenting `previous`.
pub fn derive_ui_state(session: &SessionStatus, fetch: &FetchState, previous: &UiState) -> UiState {
    match (session, fetch) {
        (SessionStatus::Connected(_), FetchState::NotFound) => UiState::AwaitingInitialization,
        (SessionStatus::Connected(_), FetchState::Ready(items)) => UiState::Ready {
            items: items.clone(),
        },
        (SessionStatus::Connected(_), FetchState::NoneYet) => previous.clone(),
        _ => UiState::AwaitingConnection,
    }
}

/// Synchronizes the local copy of the list with the ledger.
///
/// Fetches carry a monotonically increasing sequence number; a response is
/// applied only if nothing newer has been applied already, so a late stale
/// response can never overwrite a fresher one. Mutations are followed by a
/// mandatory re-fetch — the ledger stays the single source of truth, there
/// is no optimistic local append.
pub struct ListSync {
    client: ListClient,
    fetch: RwLock<FetchState>,
    issued: AtomicU64,
    applied: AtomicU64,
}

impl ListSync {
    pub fn new(client: ListClient) -> Self {
        Self {
            client,
            fetch: RwLock::new(FetchState::NoneYet),
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    pub fn account(&self) -> &AccountAddress {
        self.client.account()
    }

    pub async fn fetch_state(&self) -> FetchState {
        self.fetch.read().await.clone()
    }

    pub async fn refresh(&self) {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.client.fetch_items().await;
        self.apply(seq, outcome).await;
    }

    pub async fn initialize(&self) -> Result<(), LedgerError> {
        self.client.initialize_account().await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn submit(
        &self,
        link: &str,
        submitter: Option<AccountAddress>,
    ) -> Result<(), LedgerError> {
        self.client.append_item(link, submitter).await?;
        self.refresh().await;
        Ok(())
    }

    pub(crate) async fn apply(&self, seq: u64, outcome: Result<FetchOutcome, LedgerError>) {
        let mut fetch = self.fetch.write().await;

        if seq <= self.applied.load(Ordering::SeqCst) {
            trace!("discarding stale fetch response #{seq}");
            return;
        }

        match outcome {
            Ok(FetchOutcome::Found(items)) => {
                self.applied.store(seq, Ordering::SeqCst);
                *fetch = FetchState::Ready(items);
            }
            Ok(FetchOutcome::NotFound) => {
                self.applied.store(seq, Ordering::SeqCst);
                *fetch = FetchState::NotFound;
            }
            Err(err) => {
                warn!(
                    "list fetch failed for {}: {err}. Keeping last known items",
                    self.client.account().0
                );
            }
        }
    }
}

/// Wires the session manager and list synchronization together and derives
/// the presented view. The session's on-connected hook performs exactly one
/// refresh per transition into `Connected`.
pub struct PortalController {
    session: Arc<SessionManager>,
    list: Arc<ListSync>,
    previous: RwLock<UiState>,
}

impl PortalController {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, client: ListClient) -> Self {
        let list = Arc::new(ListSync::new(client));
        let hook_list = list.clone();
        let session = SessionManager::new(provider).on_connected(move |_address| {
            let list = hook_list.clone();
            async move { list.refresh().await }
        });

        Self {
            session: Arc::new(session),
            list,
            previous: RwLock::new(UiState::AwaitingConnection),
        }
    }

    pub fn account(&self) -> &AccountAddress {
        self.list.account()
    }

    pub async fn wallet_address(&self) -> Option<AccountAddress> {
        self.session.status().await.connected_address().cloned()
    }

    /// Startup control flow: one silent probe; a successful probe triggers
    /// the initial fetch through the on-connected hook.
    pub async fn startup(&self) -> UiState {
        self.session.probe_silent().await;
        self.ui_state().await
    }

    pub async fn connect(&self) -> Result<AccountAddress, PortalError> {
        Ok(self.session.connect_explicit().await?)
    }

    pub async fn initialize(&self) -> Result<(), PortalError> {
        self.require_connected().await?;
        self.list.initialize().await?;
        Ok(())
    }

    pub async fn submit(&self, link: &str) -> Result<(), PortalError> {
        let submitter = self.require_connected().await?;
        self.list.submit(link, Some(submitter)).await?;
        Ok(())
    }

    pub async fn refresh(&self) -> Result<(), PortalError> {
        self.require_connected().await?;
        self.list.refresh().await;
        Ok(())
    }

    pub async fn ui_state(&self) -> UiState {
        let session = self.session.status().await;
        let fetch = self.list.fetch_state().await;

        let mut previous = self.previous.write().await;
        let next = derive_ui_state(&session, &fetch, &previous);
        *previous = next.clone();
        next
    }

    async fn require_connected(&self) -> Result<AccountAddress, PortalError> {
        self.session
            .status()
            .await
            .connected_address()
            .cloned()
            .ok_or(PortalError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gp_api_types::ItemRecord;
    use gp_keys::AccountKeys;
    use gp_ledger_client::{InMemoryLedger, LedgerProgram, ListConfig};
    use std::sync::atomic::AtomicBool;

    struct MockProvider {
        trusted: bool,
    }

    #[async_trait]
    impl WalletProvider for MockProvider {
        fn is_supported(&self) -> bool {
            true
        }

        async fn connect(&self, only_if_trusted: bool) -> Result<AccountAddress, SessionError> {
            if only_if_trusted && !self.trusted {
                return Err(SessionError::Rejected("no trusted session".to_owned()));
            }
            Ok(AccountAddress("Addr1".to_owned()))
        }
    }

    /// Delegates to an in-memory ledger but fails fetches on demand.
    struct FlakyLedger {
        inner: InMemoryLedger,
        fail_fetch: AtomicBool,
    }

    impl FlakyLedger {
        fn new() -> Self {
            Self {
                inner: InMemoryLedger::default(),
                fail_fetch: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl LedgerProgram for FlakyLedger {
        async fn fetch_account(
            &self,
            address: &AccountAddress,
        ) -> Result<FetchOutcome, LedgerError> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(LedgerError::Transport("connection reset".to_owned()));
            }
            self.inner.fetch_account(address).await
        }

        async fn initialize_account(
            &self,
            address: &AccountAddress,
            keys: &AccountKeys,
        ) -> Result<gp_ledger_client::InitOutcome, LedgerError> {
            self.inner.initialize_account(address, keys).await
        }

        async fn append_item(
            &self,
            address: &AccountAddress,
            record: ItemRecord,
        ) -> Result<(), LedgerError> {
            self.inner.append_item(address, record).await
        }
    }

    fn controller_with(
        provider: Option<Arc<dyn WalletProvider>>,
        program: Arc<dyn LedgerProgram>,
        keys: AccountKeys,
    ) -> PortalController {
        PortalController::new(provider, ListClient::new(program, ListConfig::new(keys)))
    }

    fn ready_links(state: &UiState) -> Vec<&str> {
        match state {
            UiState::Ready { items } => items.iter().map(|item| item.link.as_str()).collect(),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnected_session_gates_everything() {
        let controller = controller_with(
            None,
            Arc::new(InMemoryLedger::default()),
            AccountKeys::generate(),
        );

        assert_eq!(controller.startup().await, UiState::AwaitingConnection);
        assert!(matches!(
            controller.connect().await,
            Err(PortalError::Session(SessionError::CapabilityAbsent))
        ));
        assert!(matches!(
            controller.submit("https://x/y.gif").await,
            Err(PortalError::NotConnected)
        ));
        assert_eq!(controller.ui_state().await, UiState::AwaitingConnection);
    }

    #[tokio::test]
    async fn failed_probe_then_explicit_connect_fetches_automatically() {
        let keys = AccountKeys::generate();
        let ledger = Arc::new(InMemoryLedger::default());
        ledger
            .initialize_account(&keys.address(), &keys)
            .await
            .expect("seed account");

        let provider = Arc::new(MockProvider { trusted: false });
        let controller = controller_with(Some(provider), ledger, keys);

        assert_eq!(controller.startup().await, UiState::AwaitingConnection);

        let address = controller.connect().await.expect("explicit connect");
        assert_eq!(address, AccountAddress("Addr1".to_owned()));

        // The on-connected hook already fetched; no manual refresh needed.
        assert_eq!(
            controller.ui_state().await,
            UiState::Ready { items: Vec::new() }
        );
    }

    #[tokio::test]
    async fn uninitialized_account_prompts_then_initialize_reaches_ready() {
        let provider = Arc::new(MockProvider { trusted: true });
        let controller = controller_with(
            Some(provider),
            Arc::new(InMemoryLedger::default()),
            AccountKeys::generate(),
        );

        assert_eq!(controller.startup().await, UiState::AwaitingInitialization);

        controller.initialize().await.expect("initialize");
        assert_eq!(
            controller.ui_state().await,
            UiState::Ready { items: Vec::new() }
        );
    }

    #[tokio::test]
    async fn submit_roundtrip_appends_to_the_end() {
        let provider = Arc::new(MockProvider { trusted: true });
        let controller = controller_with(
            Some(provider),
            Arc::new(InMemoryLedger::default()),
            AccountKeys::generate(),
        );

        controller.startup().await;
        controller.initialize().await.expect("initialize");
        controller.submit("https://x/a.gif").await.expect("first submit");
        controller.submit("https://x/y.gif").await.expect("second submit");

        let state = controller.ui_state().await;
        assert_eq!(ready_links(&state), vec!["https://x/a.gif", "https://x/y.gif"]);

        // Submitter attribution comes from the connected session.
        let UiState::Ready { items } = state else { unreachable!() };
        assert_eq!(
            items[0].submitter,
            Some(AccountAddress("Addr1".to_owned()))
        );
    }

    #[tokio::test]
    async fn empty_submit_leaves_the_list_unchanged() {
        let provider = Arc::new(MockProvider { trusted: true });
        let controller = controller_with(
            Some(provider),
            Arc::new(InMemoryLedger::default()),
            AccountKeys::generate(),
        );

        controller.startup().await;
        controller.initialize().await.expect("initialize");
        controller.submit("https://x/a.gif").await.expect("submit");

        let result = controller.submit("").await;
        assert!(matches!(
            result,
            Err(PortalError::Ledger(LedgerError::InvalidInput(_)))
        ));
        assert_eq!(ready_links(&controller.ui_state().await), vec!["https://x/a.gif"]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_populated_list() {
        let keys = AccountKeys::generate();
        let ledger = Arc::new(FlakyLedger::new());
        let provider = Arc::new(MockProvider { trusted: true });
        let controller = controller_with(Some(provider), ledger.clone(), keys);

        controller.startup().await;
        controller.initialize().await.expect("initialize");
        controller.submit("a.gif").await.expect("submit a");
        controller.submit("b.gif").await.expect("submit b");
        assert_eq!(ready_links(&controller.ui_state().await), vec!["a.gif", "b.gif"]);

        ledger.fail_fetch.store(true, Ordering::SeqCst);
        controller.refresh().await.expect("refresh is not an error");

        assert_eq!(ready_links(&controller.ui_state().await), vec!["a.gif", "b.gif"]);
    }

    #[tokio::test]
    async fn stale_fetch_response_is_discarded() {
        let keys = AccountKeys::generate();
        let sync = ListSync::new(ListClient::new(
            Arc::new(InMemoryLedger::default()),
            ListConfig::new(keys),
        ));

        let fresh = vec![ItemRecord::new("fresh.gif", None)];
        let stale = vec![ItemRecord::new("stale.gif", None)];

        sync.apply(2, Ok(FetchOutcome::Found(fresh.clone()))).await;
        sync.apply(1, Ok(FetchOutcome::Found(stale))).await;

        assert_eq!(sync.fetch_state().await, FetchState::Ready(fresh));
    }

    #[tokio::test]
    async fn fetch_error_never_applies_even_when_newest() {
        let keys = AccountKeys::generate();
        let sync = ListSync::new(ListClient::new(
            Arc::new(InMemoryLedger::default()),
            ListConfig::new(keys),
        ));

        let items = vec![ItemRecord::new("a.gif", None)];
        sync.apply(1, Ok(FetchOutcome::Found(items.clone()))).await;
        sync.apply(2, Err(LedgerError::Transport("reset".to_owned())))
            .await;

        assert_eq!(sync.fetch_state().await, FetchState::Ready(items));
    }

    #[test]
    fn derivation_is_gated_by_the_session() {
        let items = vec![ItemRecord::new("a.gif", None)];
        let previous = UiState::AwaitingConnection;

        for fetch in [
            FetchState::NoneYet,
            FetchState::NotFound,
            FetchState::Ready(items.clone()),
        ] {
            assert_eq!(
                derive_ui_state(&SessionStatus::Unknown, &fetch, &previous),
                UiState::AwaitingConnection
            );
            assert_eq!(
                derive_ui_state(&SessionStatus::Disconnected, &fetch, &previous),
                UiState::AwaitingConnection
            );
        }

        let connected = SessionStatus::Connected(AccountAddress("Addr1".to_owned()));
        assert_eq!(
            derive_ui_state(&connected, &FetchState::NotFound, &previous),
            UiState::AwaitingInitialization
        );
        assert_eq!(
            derive_ui_state(&connected, &FetchState::Ready(items.clone()), &previous),
            UiState::Ready { items }
        );
        assert_eq!(
            derive_ui_state(&connected, &FetchState::NoneYet, &previous),
            previous
        );
    }
}
