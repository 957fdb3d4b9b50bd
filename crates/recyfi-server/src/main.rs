//! RecyFi server entrypoint.

use clap::Parser;
use recyfi_ledger::{MemoryLedger, SystemClock};
use recyfi_server::{AppState, LoggingGateway, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recyfi-server")]
#[command(about = "Deposit-for-WiFi access ledger", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    let store = match &config.snapshot_path {
        Some(path) => Arc::new(MemoryLedger::with_snapshot(path)?),
        None => Arc::new(MemoryLedger::new()),
    };

    let state = AppState::new(
        store,
        Arc::new(LoggingGateway),
        Arc::new(SystemClock),
        config,
    )?;

    recyfi_server::serve(state).await
}
