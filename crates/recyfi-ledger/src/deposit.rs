//! Deposit recording: append the event, move the session window, roll up
//! the day bucket.
//!
//! The three sub-steps are one logical unit with a deliberate asymmetry: the
//! event append is never rolled back. If the session or aggregate step fails
//! afterwards the physical deposit stays recorded and the error propagates;
//! session and rollup state are cheap to repair, a lost deposit is not.

use crate::session::SessionManager;
use crate::stats::StatsAggregator;
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use recyfi_core::{DepositEvent, DeviceKey, Result, Session};
use std::sync::Arc;
use tracing::info;

/// Outcome of one recorded deposit.
#[derive(Debug, Clone)]
pub struct DepositReceipt {
    /// The appended, immutable deposit event
    pub event: DepositEvent,
    /// The session after applying this deposit
    pub session: Session,
    /// Whether the deposit created a fresh session window
    pub created: bool,
}

/// Appends immutable deposit events and triggers the dependent updates.
pub struct DepositRecorder {
    store: Arc<dyn LedgerStore>,
    sessions: Arc<SessionManager>,
    stats: Arc<StatsAggregator>,
}

impl DepositRecorder {
    /// Wire a recorder over the shared store and its sibling components.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        sessions: Arc<SessionManager>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            store,
            sessions,
            stats,
        }
    }

    /// Record one physical deposit for `key` at `now`.
    ///
    /// Appends the event, then extend-or-creates the session, then bumps the
    /// day bucket (`+1` deposit, `+1` session iff one was created). The
    /// caller is expected to invoke the access gateway afterwards; gateway
    /// failure does not undo any of this.
    pub async fn record(&self, key: &DeviceKey, now: DateTime<Utc>) -> Result<DepositReceipt> {
        let event = self.store.append_deposit(key, now).await?;

        let (session, created) = self.sessions.extend_or_create(key, now).await?;

        let sessions_delta = if created { 1 } else { 0 };
        self.stats
            .increment(now.date_naive(), 1, sessions_delta)
            .await?;

        info!(
            device = %key,
            event_id = event.id,
            created,
            session_end = %session.end,
            "deposit recorded"
        );

        Ok(DepositReceipt {
            event,
            session,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use chrono::TimeZone;
    use recyfi_core::GrantConfig;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn key(s: &str) -> DeviceKey {
        DeviceKey::parse(s).unwrap()
    }

    fn recorder() -> (Arc<MemoryLedger>, DepositRecorder) {
        let store = Arc::new(MemoryLedger::new());
        let sessions = Arc::new(SessionManager::new(store.clone(), GrantConfig::default()));
        let stats = Arc::new(StatsAggregator::new(store.clone()));
        (store.clone(), DepositRecorder::new(store, sessions, stats))
    }

    #[tokio::test]
    async fn record_touches_all_three_tables() {
        let (store, recorder) = recorder();
        let now = at(1_000_000);

        let receipt = recorder.record(&key("AA"), now).await.unwrap();
        assert_eq!(receipt.event.id, 1);
        assert!(receipt.created);
        assert_eq!(receipt.session.deposit_count, 1);

        let row = store.aggregate(now.date_naive()).await.unwrap().unwrap();
        assert_eq!(row.total_deposits, 1);
        assert_eq!(row.total_sessions_created, 1);
    }

    #[tokio::test]
    async fn second_deposit_extends_without_counting_a_session() {
        let (store, recorder) = recorder();
        let now = at(1_000_000);

        recorder.record(&key("AA"), now).await.unwrap();
        let receipt = recorder
            .record(&key("AA"), now + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(!receipt.created);
        assert_eq!(receipt.event.id, 2);
        assert_eq!(receipt.session.deposit_count, 2);

        let row = store.aggregate(now.date_naive()).await.unwrap().unwrap();
        assert_eq!(row.total_deposits, 2);
        assert_eq!(row.total_sessions_created, 1);
    }
}
