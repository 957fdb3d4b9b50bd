//! Aggregate dashboards and the administrative reset.

use super::ApiError;
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use recyfi_core::DailyAggregate;
use recyfi_ledger::{LedgerStore, RealtimeStats};
use serde::Serialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/realtime", get(realtime))
        .route("/history/:days", get(history))
        .route("/reset-today", post(reset_today))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardResponse {
    today: DailyAggregate,
    total_bottles: u64,
    active_sessions: usize,
    total_users: usize,
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let now = state.clock.now();
    let today = state.stats.today(now).await?;
    let total_bottles = state.store.total_deposits().await?;
    let active_sessions = state.sessions.list_active(now).await?.len();
    let total_users = state.sessions.distinct_device_count().await?;

    Ok(Json(DashboardResponse {
        today,
        total_bottles,
        active_sessions,
        total_users,
    }))
}

async fn realtime(State(state): State<AppState>) -> Result<Json<RealtimeStats>, ApiError> {
    let now = state.clock.now();
    let active_now = state.sessions.list_active(now).await?.len();
    let stats = state.stats.realtime(now, active_now).await?;
    Ok(Json(stats))
}

/// Daily rollups for the trailing window; a zero-day request still covers
/// today.
async fn history(
    State(state): State<AppState>,
    Path(days): Path<u32>,
) -> Result<Json<Vec<DailyAggregate>>, ApiError> {
    let now = state.clock.now();
    let rows = state.stats.history(now, days.max(1)).await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
struct ResetResponse {
    success: bool,
}

/// Administrative: zero today's rollup without touching events.
async fn reset_today(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let now = state.clock.now();
    state.stats.reset_today(now).await?;
    Ok(Json(ResetResponse { success: true }))
}
