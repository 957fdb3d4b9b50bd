//! Server configuration.
//!
//! Defaults match the portal policy: 15 minute base grant, 5 minute
//! extension, 30 second bottle-detection window, history capped at 100
//! events. A TOML file can override any field; missing fields fall back to
//! the defaults.

use anyhow::Context;
use recyfi_core::GrantConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the server binds to
    pub bind_address: String,
    /// Seconds granted on session creation
    pub base_grant_secs: u64,
    /// Seconds added per deposit while a session is active
    pub extension_grant_secs: u64,
    /// Optional JSON snapshot file mirroring the in-memory ledger
    pub snapshot_path: Option<PathBuf>,
    /// Upper bound on the access-gateway grant call
    pub gateway_timeout_secs: u64,
    /// Trailing window consulted by `/bottle/status`
    pub detection_window_secs: u64,
    /// Cap on `/bottle/history` results
    pub history_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            base_grant_secs: 15 * 60,
            extension_grant_secs: 5 * 60,
            snapshot_path: None,
            gateway_timeout_secs: 5,
            detection_window_secs: 30,
            history_limit: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Grant durations for the session manager.
    pub fn grants(&self) -> GrantConfig {
        GrantConfig {
            base_grant_secs: self.base_grant_secs,
            extension_grant_secs: self.extension_grant_secs,
        }
    }

    /// Gateway call timeout.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Bottle-detection window.
    pub fn detection_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.detection_window_secs as i64)
    }
}
