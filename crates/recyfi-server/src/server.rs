//! Router assembly and shared application state.

use crate::config::ServerConfig;
use crate::gateway::AccessGateway;
use crate::routes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use recyfi_core::{Clock, Result};
use recyfi_ledger::{DepositRecorder, LedgerStore, SessionManager, StatsAggregator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all handlers.
///
/// The ledger components all sit over one shared store; the state itself is
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub sessions: Arc<SessionManager>,
    pub recorder: Arc<DepositRecorder>,
    pub stats: Arc<StatsAggregator>,
    pub gateway: Arc<dyn AccessGateway>,
    pub clock: Arc<dyn Clock>,
    pub config: ServerConfig,
}

impl AppState {
    /// Wire the ledger components over a store and external collaborators.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        gateway: Arc<dyn AccessGateway>,
        clock: Arc<dyn Clock>,
        config: ServerConfig,
    ) -> Result<Self> {
        let grants = config.grants();
        grants.validate()?;

        let sessions = Arc::new(SessionManager::new(store.clone(), grants));
        let stats = Arc::new(StatsAggregator::new(store.clone()));
        let recorder = Arc::new(DepositRecorder::new(
            store.clone(),
            sessions.clone(),
            stats.clone(),
        ));

        Ok(Self {
            store,
            sessions,
            recorder,
            stats,
            gateway,
            clock,
            config,
        })
    }
}

/// Build the application router.
///
/// CORS is permissive: the captive-portal page is served from the access
/// point's origin, not ours.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/bottle", routes::bottle::router())
        .nest("/user", routes::user::router())
        .nest("/stats", routes::stats::router())
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = state.config.bind_address.parse()?;
    let app = router(state);

    info!("starting RecyFi server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Liveness probe.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": state.clock.now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
