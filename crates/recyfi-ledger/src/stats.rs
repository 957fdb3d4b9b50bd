//! Per-day rollups derived from deposit events.
//!
//! `StatsAggregator` exclusively owns aggregate mutation; it is invoked only
//! by the deposit recorder (and indirectly by session creation through it).
//! `reset_today` is the one administrative exception: it zeroes today's row
//! without deleting events, accepting a documented divergence between the
//! row and the recount until the day rolls over.

use crate::store::LedgerStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use recyfi_core::{DailyAggregate, Result, CO2_PER_DEPOSIT_KG};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Counters for the `/stats/realtime` poll.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    /// Deposits in the trailing hour
    pub bottles_last_hour: usize,
    /// Sessions active at the query instant
    pub active_now: usize,
    /// Today's total deposits (post any administrative reset)
    pub today_total: u64,
    /// The query instant
    pub timestamp: DateTime<Utc>,
}

/// Maintains the per-day rollup rows.
pub struct StatsAggregator {
    store: Arc<dyn LedgerStore>,
}

impl StatsAggregator {
    /// Create an aggregator over the shared store.
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Add deltas to the day's row, creating a zeroed row first if absent.
    ///
    /// CO2 savings follow the deposit delta. Safe under concurrent callers
    /// for the same day; the store applies the upsert-then-add atomically.
    pub async fn increment(
        &self,
        day: NaiveDate,
        deposits: u64,
        sessions_created: u64,
    ) -> Result<DailyAggregate> {
        let co2_kg = deposits as f64 * CO2_PER_DEPOSIT_KG;
        self.store
            .apply_aggregate_delta(day, deposits, sessions_created, co2_kg)
            .await
    }

    /// Today's row, or a zero-valued one if no deposit has landed yet.
    pub async fn today(&self, now: DateTime<Utc>) -> Result<DailyAggregate> {
        let day = now.date_naive();
        Ok(self
            .store
            .aggregate(day)
            .await?
            .unwrap_or_else(|| DailyAggregate::zero(day)))
    }

    /// Rows covering `[now - window_days, now]`, ordered day descending.
    ///
    /// A window reaching past the calendar floor saturates to it; the
    /// window size is caller-supplied and must not be able to panic.
    pub async fn history(&self, now: DateTime<Utc>, window_days: u32) -> Result<Vec<DailyAggregate>> {
        let to = now.date_naive();
        let from = to
            .checked_sub_signed(Duration::days(window_days as i64))
            .unwrap_or(NaiveDate::MIN);
        self.store.aggregates_in_window(from, to).await
    }

    /// Administrative reset of today's row only.
    ///
    /// Other days and all deposit events are untouched, so today's counters
    /// intentionally diverge from a recount of today's events.
    pub async fn reset_today(&self, now: DateTime<Utc>) -> Result<()> {
        let day = now.date_naive();
        warn!(%day, "administrative reset of today's aggregate");
        self.store.remove_aggregate(day).await
    }

    /// Realtime counters for the polling dashboard.
    ///
    /// `active_now` is supplied by the caller, which owns session liveness.
    pub async fn realtime(&self, now: DateTime<Utc>, active_now: usize) -> Result<RealtimeStats> {
        let bottles_last_hour = self.store.deposits_since(now - Duration::hours(1)).await?;
        let today_total = self.today(now).await?.total_deposits;
        Ok(RealtimeStats {
            bottles_last_hour,
            active_now,
            today_total,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use chrono::TimeZone;
    use recyfi_core::DeviceKey;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn aggregator() -> (Arc<MemoryLedger>, StatsAggregator) {
        let store = Arc::new(MemoryLedger::new());
        (store.clone(), StatsAggregator::new(store))
    }

    #[tokio::test]
    async fn today_is_zero_before_any_deposit() {
        let (_, stats) = aggregator();
        let row = stats.today(at(1_000_000)).await.unwrap();
        assert_eq!(row.day, at(1_000_000).date_naive());
        assert_eq!(row.total_deposits, 0);
        assert_eq!(row.total_sessions_created, 0);
    }

    #[tokio::test]
    async fn increment_adds_co2_with_deposits() {
        let (_, stats) = aggregator();
        let day = at(0).date_naive();
        stats.increment(day, 1, 1).await.unwrap();
        let row = stats.increment(day, 1, 0).await.unwrap();
        assert_eq!(row.total_deposits, 2);
        assert!((row.co2_saved_kg - 2.0 * CO2_PER_DEPOSIT_KG).abs() < 1e-9);
    }

    #[tokio::test]
    async fn history_covers_the_window_newest_first() {
        let (_, stats) = aggregator();
        let now = at(10 * 86_400);
        let today = now.date_naive();
        for offset in 0..5 {
            let day = today - Duration::days(offset);
            stats.increment(day, offset as u64 + 1, 0).await.unwrap();
        }

        let rows = stats.history(now, 2).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].day, today);
        assert_eq!(rows[2].day, today - Duration::days(2));
    }

    #[tokio::test]
    async fn history_saturates_instead_of_underflowing_on_huge_windows() {
        let (_, stats) = aggregator();
        let now = at(10 * 86_400);
        let today = now.date_naive();
        stats.increment(today, 1, 1).await.unwrap();

        // A window far beyond the calendar floor still answers normally.
        let rows = stats.history(now, u32::MAX).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day, today);
    }

    #[tokio::test]
    async fn reset_today_only_touches_today() {
        let (store, stats) = aggregator();
        let now = at(10 * 86_400);
        let today = now.date_naive();
        let yesterday = today.pred_opt().unwrap();

        let aa = DeviceKey::parse("AA").unwrap();
        store.append_deposit(&aa, now).await.unwrap();
        stats.increment(today, 1, 1).await.unwrap();
        stats.increment(yesterday, 4, 2).await.unwrap();

        stats.reset_today(now).await.unwrap();

        assert_eq!(stats.today(now).await.unwrap().total_deposits, 0);
        let rows = stats.history(now, 7).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day, yesterday);
        assert_eq!(rows[0].total_deposits, 4);
        // Events survive the reset
        assert_eq!(store.total_deposits().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn realtime_counts_the_trailing_hour() {
        let (store, stats) = aggregator();
        let now = at(10_000);
        let aa = DeviceKey::parse("AA").unwrap();

        store.append_deposit(&aa, now - Duration::hours(2)).await.unwrap();
        store.append_deposit(&aa, now - Duration::minutes(30)).await.unwrap();
        store.append_deposit(&aa, now).await.unwrap();
        stats.increment(now.date_naive(), 3, 1).await.unwrap();

        let realtime = stats.realtime(now, 2).await.unwrap();
        assert_eq!(realtime.bottles_last_hour, 2);
        assert_eq!(realtime.active_now, 2);
        assert_eq!(realtime.today_total, 3);
        assert_eq!(realtime.timestamp, now);
    }
}
