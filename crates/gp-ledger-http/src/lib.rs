use async_trait::async_trait;
use gp_api_types::{AccountAddress, ItemRecord, SignPurpose};
use gp_keys::{AccountKeys, to_hex};
use gp_ledger_client::{FetchOutcome, InitOutcome, LedgerError, LedgerProgram};
use serde::{Deserialize, Serialize};

mod descriptor;

pub use descriptor::{InstructionDescriptor, ProgramDescriptor, REQUIRED_INSTRUCTIONS};

/// HTTP adapter for the deployed list program.
///
/// Endpoint and program id are passed in explicitly; nothing is read from
/// the environment here.
pub struct HttpLedger {
    endpoint: String,
    program_id: String,
    http: reqwest::Client,
}

impl HttpLedger {
    pub fn new(endpoint: &str, program_id: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            program_id: program_id.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_descriptor(descriptor: &ProgramDescriptor, endpoint: &str) -> Self {
        Self::new(endpoint, &descriptor.program_id)
    }

    fn accounts_url(&self) -> String {
        format!("{}/programs/{}/accounts", self.endpoint, self.program_id)
    }

    fn account_url(&self, address: &AccountAddress) -> String {
        format!("{}/{}", self.accounts_url(), address.0)
    }

    fn items_url(&self, address: &AccountAddress) -> String {
        format!("{}/items", self.account_url(address))
    }
}

// ── portal program REST API types ────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AccountResponse {
    items: Vec<ItemWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ItemWire {
    link: String,
    #[serde(default)]
    submitter: Option<String>,
}

impl From<ItemWire> for ItemRecord {
    fn from(wire: ItemWire) -> Self {
        ItemRecord::new(wire.link, wire.submitter.map(AccountAddress))
    }
}

#[derive(Debug, Serialize)]
struct CreateAccountRequest {
    account: String,
    owner_public_key: String,
    signature: String,
}

#[derive(Debug, Serialize)]
struct AppendItemRequest {
    link: String,
    submitter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

async fn status_error(response: reqwest::Response) -> LedgerError {
    let code = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    LedgerError::Status { code, message }
}

fn transport(err: reqwest::Error) -> LedgerError {
    LedgerError::Transport(err.to_string())
}

#[async_trait]
impl LedgerProgram for HttpLedger {
    async fn fetch_account(&self, address: &AccountAddress) -> Result<FetchOutcome, LedgerError> {
        let response = self
            .http
            .get(self.account_url(address))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: AccountResponse = response
            .json()
            .await
            .map_err(|err| LedgerError::Decode(err.to_string()))?;

        Ok(FetchOutcome::Found(
            body.items.into_iter().map(ItemRecord::from).collect(),
        ))
    }

    async fn initialize_account(
        &self,
        address: &AccountAddress,
        keys: &AccountKeys,
    ) -> Result<InitOutcome, LedgerError> {
        let signature = keys
            .sign(address.0.as_bytes(), SignPurpose::InitializeAccount)
            .map_err(|err| LedgerError::Signing(err.to_string()))?;

        let body = CreateAccountRequest {
            account: address.0.clone(),
            owner_public_key: keys.public_key_hex(),
            signature: to_hex(&signature),
        };

        let response = self
            .http
            .post(self.accounts_url())
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(InitOutcome::AlreadyExists);
        }

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(InitOutcome::Created)
    }

    async fn append_item(
        &self,
        address: &AccountAddress,
        record: ItemRecord,
    ) -> Result<(), LedgerError> {
        let body = AppendItemRequest {
            link: record.link,
            submitter: record.submitter.map(|submitter| submitter.0),
        };

        let response = self
            .http
            .post(self.items_url(address))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(())
    }
}
