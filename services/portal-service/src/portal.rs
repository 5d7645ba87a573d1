use axum::{Json, extract::State};
use gp_api_types::{
    ConnectResponse, InitializeResponse, PortalStateResponse, SubmitItemRequest,
    SubmitItemResponse, UiState,
};
use tracing::info;
use uuid::Uuid;

use crate::{ApiResult, AppState, portal_error};

pub(crate) async fn portal_state(State(state): State<AppState>) -> Json<PortalStateResponse> {
    let ui = state.controller.ui_state().await;
    let wallet_address = state
        .controller
        .wallet_address()
        .await
        .map(|address| address.0);

    Json(PortalStateResponse {
        state: ui,
        wallet_address,
        panel: state.panel.clone(),
    })
}

pub(crate) async fn wallet_connect(State(state): State<AppState>) -> ApiResult<ConnectResponse> {
    let address = state.controller.connect().await.map_err(portal_error)?;

    Ok(Json(ConnectResponse {
        wallet_address: address.0,
    }))
}

pub(crate) async fn portal_initialize(
    State(state): State<AppState>,
) -> ApiResult<InitializeResponse> {
    state.controller.initialize().await.map_err(portal_error)?;

    Ok(Json(InitializeResponse {
        initialized: true,
        account_address: state.controller.account().0.clone(),
    }))
}

pub(crate) async fn portal_submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitItemRequest>,
) -> ApiResult<SubmitItemResponse> {
    state
        .controller
        .submit(&request.link)
        .await
        .map_err(portal_error)?;

    let submission_id = Uuid::new_v4().to_string();
    let item_count = match state.controller.ui_state().await {
        UiState::Ready { items } => items.len(),
        _ => 0,
    };
    info!("item appended (submission {submission_id})");

    Ok(Json(SubmitItemResponse {
        accepted: true,
        submission_id,
        item_count,
    }))
}
