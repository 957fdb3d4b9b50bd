//! Deposit recording and bottle-detection polling.

use super::ApiError;
use crate::gateway;
use crate::server::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use recyfi_core::DeviceKey;
use recyfi_ledger::LedgerStore;
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/deposit", post(deposit))
        .route("/status", get(status))
        .route("/history", get(history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositRequest {
    #[serde(default)]
    device_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DepositResponse {
    success: bool,
    session_id: u64,
    message: String,
}

/// Record a physical deposit and grant network access.
///
/// The gateway grant runs after the ledger commit and is best-effort: its
/// failure never turns an accepted deposit into an HTTP error.
async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, ApiError> {
    let key = DeviceKey::parse(request.device_key.as_deref().unwrap_or(""))?;
    let now = state.clock.now();

    let receipt = state.recorder.record(&key, now).await?;

    gateway::grant_best_effort(state.gateway.as_ref(), &key, state.config.gateway_timeout()).await;

    let minutes = if receipt.created {
        state.config.base_grant_secs / 60
    } else {
        state.config.extension_grant_secs / 60
    };
    let message = if receipt.created {
        format!("WiFi access granted for {minutes} minutes")
    } else {
        format!("Session extended by {minutes} minutes")
    };

    Ok(Json(DepositResponse {
        success: true,
        session_id: receipt.event.id,
        message,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    bottle_detected: bool,
}

/// True iff a deposit landed within the detection window (30 s default).
async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let now = state.clock.now();
    let since = now - state.config.detection_window();
    let count = state.store.deposits_since(since).await?;
    Ok(Json(StatusResponse {
        bottle_detected: count > 0,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiDeposit {
    id: u64,
    device_key: String,
    timestamp: DateTime<Utc>,
}

/// Recent deposit events, newest first, capped.
async fn history(State(state): State<AppState>) -> Result<Json<Vec<ApiDeposit>>, ApiError> {
    let events = state.store.recent_deposits(state.config.history_limit).await?;
    Ok(Json(
        events
            .into_iter()
            .map(|e| ApiDeposit {
                id: e.id,
                device_key: e.device_key.to_string(),
                timestamp: e.timestamp,
            })
            .collect(),
    ))
}
