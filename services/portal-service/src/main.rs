use anyhow::Context;
use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use gp_api_types::PortalPanel;
use gp_controller::{PortalController, PortalError};
use gp_keys::AccountKeys;
use gp_ledger_client::{InMemoryLedger, LedgerError, LedgerProgram, ListClient, ListConfig};
use gp_ledger_http::{HttpLedger, ProgramDescriptor};
use gp_wallet::{SessionError, WalletProvider};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

mod config;
mod portal;
mod provider;

use config::ServiceConfig;
use provider::HostedProvider;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
struct AppState {
    controller: Arc<PortalController>,
    panel: PortalPanel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServiceConfig::from_env();
    let state = build_state(&config)?;

    let opening = state.controller.startup().await;
    info!("portal ready; initial view {:?}", opening);

    let app = router(state).layer(CorsLayer::permissive());

    let addr: SocketAddr = config.bind_addr.parse().context("invalid bind address")?;
    info!("portal-service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/portal", get(portal::portal_state))
        .route("/wallet/connect", post(portal::wallet_connect))
        .route("/portal/initialize", post(portal::portal_initialize))
        .route("/portal/items", post(portal::portal_submit))
        .with_state(state)
}

fn build_state(config: &ServiceConfig) -> anyhow::Result<AppState> {
    let keys = match AccountKeys::load_keypair_file(&config.keypair_path) {
        Ok(keys) => keys,
        Err(err) => {
            warn!("{err}; generating an ephemeral account keypair");
            AccountKeys::generate()
        }
    };

    let program: Arc<dyn LedgerProgram> = if config.local_ledger {
        info!("using the in-memory ledger (local mode)");
        Arc::new(InMemoryLedger::default())
    } else {
        let descriptor = ProgramDescriptor::from_file(&config.descriptor_path)?;
        info!(
            "ledger program {} at {}",
            descriptor.program_id, config.ledger_url
        );
        Arc::new(HttpLedger::from_descriptor(&descriptor, &config.ledger_url))
    };

    let client = ListClient::new(program, ListConfig::new(keys));
    let provider: Option<Arc<dyn WalletProvider>> = config
        .hosted_wallet
        .then(|| Arc::new(HostedProvider::new()) as Arc<dyn WalletProvider>);

    let panel = PortalPanel {
        account_address: client.account().0.clone(),
        network: config.network.clone(),
        community_link: config.community_link.clone(),
    };

    Ok(AppState {
        controller: Arc::new(PortalController::new(provider, client)),
        panel,
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "portal-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "portal-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

fn forbidden(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::FORBIDDEN, Json(ErrorResponse { error: message }))
}

fn bad_gateway(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse { error: message }),
    )
}

fn portal_error(err: PortalError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        PortalError::Session(SessionError::CapabilityAbsent) => {
            bad_request("wallet capability not found; install a supported wallet")
        }
        PortalError::Session(SessionError::Rejected(reason)) => {
            forbidden(format!("wallet connection rejected: {reason}"))
        }
        PortalError::Ledger(LedgerError::InvalidInput(reason)) => bad_request(reason),
        PortalError::Ledger(err) => bad_gateway(err.to_string()),
        PortalError::NotConnected => bad_request("connect a wallet first"),
    }
}
