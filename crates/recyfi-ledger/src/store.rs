//! Pluggable storage contract for the ledger.
//!
//! Any backing engine must honor two guarantees: read-then-write visibility
//! within a single method call is atomic per key, and no partial write of a
//! record is ever observable. Per-device-key serialization of the
//! extend-or-create decision lives above this contract, in `SessionManager`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use recyfi_core::{DailyAggregate, DepositEvent, DeviceKey, Result, Session};

/// Durable key-value record of sessions, deposit events, and daily
/// aggregates.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch the session row for a device key, active or lapsed.
    async fn session(&self, key: &DeviceKey) -> Result<Option<Session>>;

    /// Atomic upsert-by-key of a session row.
    async fn put_session(&self, session: Session) -> Result<()>;

    /// All stored session rows, irrespective of liveness.
    async fn sessions(&self) -> Result<Vec<Session>>;

    /// Count of distinct device keys ever recorded.
    async fn distinct_device_count(&self) -> Result<usize>;

    /// Append a deposit event with a fresh auto-increment identifier.
    ///
    /// Events are append-only: never mutated, never deleted.
    async fn append_deposit(
        &self,
        key: &DeviceKey,
        timestamp: DateTime<Utc>,
    ) -> Result<DepositEvent>;

    /// Most recent deposit events, newest first, capped at `limit`.
    async fn recent_deposits(&self, limit: usize) -> Result<Vec<DepositEvent>>;

    /// Count of deposit events with `timestamp >= since`.
    async fn deposits_since(&self, since: DateTime<Utc>) -> Result<usize>;

    /// Total count of deposit events ever recorded.
    async fn total_deposits(&self) -> Result<u64>;

    /// Fetch the aggregate row for a calendar day.
    async fn aggregate(&self, day: NaiveDate) -> Result<Option<DailyAggregate>>;

    /// Atomically upsert the day's row (zeroed if absent) and add the deltas.
    ///
    /// Safe to call concurrently for the same day; returns the row after the
    /// addition.
    async fn apply_aggregate_delta(
        &self,
        day: NaiveDate,
        deposits: u64,
        sessions_created: u64,
        co2_kg: f64,
    ) -> Result<DailyAggregate>;

    /// Aggregate rows with `from <= day <= to`, ordered day descending.
    async fn aggregates_in_window(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAggregate>>;

    /// Delete the aggregate row for one day, leaving events untouched.
    async fn remove_aggregate(&self, day: NaiveDate) -> Result<()>;
}
