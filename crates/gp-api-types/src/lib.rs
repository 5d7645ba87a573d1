use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignPurpose {
    InitializeAccount,
    AppendItem,
}

/// Address of an account on the ledger — the shared list account or a
/// connected wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AccountAddress(pub String);

/// One submitted link, with the wallet that appended it when known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRecord {
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter: Option<AccountAddress>,
}

impl ItemRecord {
    pub fn new<S: Into<String>>(link: S, submitter: Option<AccountAddress>) -> Self {
        Self {
            link: link.into(),
            submitter,
        }
    }
}

/// Which of the three mutually exclusive views the user is shown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum UiState {
    AwaitingConnection,
    AwaitingInitialization,
    Ready { items: Vec<ItemRecord> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalPanel {
    pub account_address: String,
    pub network: String,
    pub community_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalStateResponse {
    #[serde(flatten)]
    pub state: UiState,
    pub wallet_address: Option<String>,
    pub panel: PortalPanel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub initialized: bool,
    pub account_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitItemRequest {
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitItemResponse {
    pub accepted: bool,
    pub submission_id: String,
    pub item_count: usize,
}
