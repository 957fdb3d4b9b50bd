//! Access-gateway adapter boundary.
//!
//! The gateway instructs the network access point to admit a device. It is
//! invoked after the ledger commit, outside any lock, bounded by a timeout;
//! failure or timeout is logged and never changes the HTTP response, since
//! the deposit is already committed by the time the gateway runs.

use async_trait::async_trait;
use recyfi_core::{DeviceKey, LedgerError, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Outbound command that admits a device onto the network.
#[async_trait]
pub trait AccessGateway: Send + Sync {
    /// Instruct the access point to admit `key`.
    async fn grant(&self, key: &DeviceKey) -> Result<()>;
}

/// Gateway stand-in that logs the grant and reports success.
///
/// The production deployment replaces this with the access point's REST
/// call; the portal ships with the call disabled the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingGateway;

#[async_trait]
impl AccessGateway for LoggingGateway {
    async fn grant(&self, key: &DeviceKey) -> Result<()> {
        info!(device = %key, "granting network access");
        Ok(())
    }
}

/// Fire-and-forget grant with a timeout.
///
/// A slow or failing gateway is a soft failure: the ledger state is already
/// committed, so the attempt is logged and the caller proceeds.
pub async fn grant_best_effort(gateway: &dyn AccessGateway, key: &DeviceKey, timeout: Duration) {
    let outcome = tokio::time::timeout(timeout, gateway.grant(key)).await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(device = %key, error = %err, "access gateway grant failed");
        }
        Err(_) => {
            let err = LedgerError::gateway(format!("grant timed out after {timeout:?}"));
            warn!(device = %key, error = %err, "access gateway grant timed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyGateway {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl AccessGateway for FlakyGateway {
        async fn grant(&self, _key: &DeviceKey) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LedgerError::gateway("access point unreachable"))
            } else {
                Ok(())
            }
        }
    }

    struct HangingGateway;

    #[async_trait]
    impl AccessGateway for HangingGateway {
        async fn grant(&self, _key: &DeviceKey) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn failure_is_swallowed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = FlakyGateway {
            calls: calls.clone(),
            fail: true,
        };
        let key = DeviceKey::parse("AA").unwrap();
        grant_best_effort(&gateway, &key, Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_gateway_is_cut_off_by_the_timeout() {
        let key = DeviceKey::parse("AA").unwrap();
        // With time paused, tokio auto-advances past the sleep; the timeout
        // fires first and the call returns instead of blocking.
        grant_best_effort(&HangingGateway, &key, Duration::from_secs(5)).await;
    }
}
