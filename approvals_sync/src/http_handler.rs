use std::sync::Arc;

use alloy::primitives::Address;
use approvals_state::{can_submit, AppState, AppView, IntentId, RawEvent, UiSelection};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{app_state::ServiceState, eth_client::IntentAction};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub selected: Option<IntentId>,
}

#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub account: Option<Address>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentsResponse {
    #[serde(flatten)]
    pub view: AppView,
    /// Whether the connected account may open a new intent.
    pub can_submit: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub intent_id: IntentId,
    pub action: &'static str,
    pub status: &'static str,
}

pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(get_state))
        .route("/intents", get(get_intents))
        .route("/account", put(put_account))
        .route("/intents/{id}/approve", post(approve))
        .route("/intents/{id}/reject", post(reject))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

async fn get_state(State(state): State<ServiceState>) -> Json<AppState> {
    let published = state.snapshots.borrow().clone();
    Json(AppState::clone(&published.state))
}

async fn get_intents(
    State(state): State<ServiceState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<IntentsResponse>, StatusCode> {
    let published = state.snapshots.borrow().clone();
    let selection = match params.selected {
        Some(id) => UiSelection::default().select(id),
        None => UiSelection::default(),
    };
    let view = {
        let mut views = state.views.lock().map_err(|err| {
            error!("view cache poisoned: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        views.get_or_derive(published.revision, &published.state, &selection)
    };
    let can_submit = can_submit(&state.eth, published.connected_account).await;
    Ok(Json(IntentsResponse {
        view: Arc::unwrap_or_clone(view),
        can_submit,
    }))
}

async fn put_account(
    State(state): State<ServiceState>,
    Json(request): Json<AccountRequest>,
) -> StatusCode {
    info!(account = ?request.account, "connected account changed");
    match state.events.send(RawEvent::account_changed(request.account)).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(err) => {
            error!("fold task unavailable: {}", err);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn approve(
    State(state): State<ServiceState>,
    Path(id): Path<IntentId>,
) -> Result<(StatusCode, Json<ActionResponse>), StatusCode> {
    submit_action(state, IntentAction::Approve, id)
}

async fn reject(
    State(state): State<ServiceState>,
    Path(id): Path<IntentId>,
) -> Result<(StatusCode, Json<ActionResponse>), StatusCode> {
    submit_action(state, IntentAction::Reject, id)
}

/// Fire and forget: the transaction is sent in the background and the resulting
/// contract event updates the state through the normal fold.
fn submit_action(
    state: ServiceState,
    action: IntentAction,
    intent_id: IntentId,
) -> Result<(StatusCode, Json<ActionResponse>), StatusCode> {
    if !state.eth.can_submit() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let eth = state.eth.clone();
    tokio::spawn(async move {
        match eth.submit(action, intent_id).await {
            Ok(tx_hash) => info!(intent_id, %tx_hash, "{} submitted", action.as_str()),
            Err(err) => error!(intent_id, "{} failed: {:#}", action.as_str(), err),
        }
    });
    Ok((
        StatusCode::ACCEPTED,
        Json(ActionResponse {
            intent_id,
            action: action.as_str(),
            status: "submitted",
        }),
    ))
}
