//! Session queries and the extension-only path.

use super::{ApiError, ApiSession};
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use recyfi_core::DeviceKey;
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session/:device_key", get(session))
        .route("/extend", post(extend))
        .route("/active", get(active))
}

/// Active session for a device, or 404 once it has lapsed.
async fn session(
    State(state): State<AppState>,
    Path(device_key): Path<String>,
) -> Result<Json<ApiSession>, ApiError> {
    let key = DeviceKey::parse(&device_key)?;
    let now = state.clock.now();
    let session = state
        .sessions
        .find_active(&key, now)
        .await?
        .ok_or_else(|| recyfi_core::LedgerError::not_found("No active session found"))?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtendRequest {
    #[serde(default)]
    device_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExtendResponse {
    success: bool,
    message: String,
}

/// Extension-only wrapper: never creates a session.
async fn extend(
    State(state): State<AppState>,
    Json(request): Json<ExtendRequest>,
) -> Result<Json<ExtendResponse>, ApiError> {
    let key = DeviceKey::parse(request.device_key.as_deref().unwrap_or(""))?;
    let now = state.clock.now();
    state.sessions.extend_active(&key, now).await?;
    let minutes = state.config.extension_grant_secs / 60;
    Ok(Json(ExtendResponse {
        success: true,
        message: format!("Session extended by {minutes} minutes"),
    }))
}

/// All active sessions, soonest to lapse last.
async fn active(State(state): State<AppState>) -> Result<Json<Vec<ApiSession>>, ApiError> {
    let now = state.clock.now();
    let sessions = state.sessions.list_active(now).await?;
    Ok(Json(sessions.into_iter().map(ApiSession::from).collect()))
}
