//! HTTP route groups, mirroring the portal layout.
//!
//! Validation and not-found are surfaced at this boundary as client errors;
//! storage errors propagate as server errors; gateway errors never reach a
//! response (see `gateway`).

pub mod bottle;
pub mod stats;
pub mod user;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use recyfi_core::{LedgerError, Session};
use serde::Serialize;

/// Ledger error carried to an HTTP response.
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::Validation { .. } => StatusCode::BAD_REQUEST,
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Storage { .. } | LedgerError::Gateway { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Session as exposed on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSession {
    pub device_key: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub deposit_count: u32,
}

impl From<Session> for ApiSession {
    fn from(session: Session) -> Self {
        Self {
            device_key: session.key.to_string(),
            start: session.start,
            end: session.end,
            deposit_count: session.deposit_count,
        }
    }
}
