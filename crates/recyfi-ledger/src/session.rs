//! Extend-or-create session state machine.
//!
//! `SessionManager` exclusively owns the session lifecycle. The critical
//! property is per-device-key atomicity: the read-decide-write of
//! `extend_or_create` runs under a per-key async mutex, so N concurrent
//! deposits for one key net to exactly N sequential applications of the
//! transition rule in some order. Two concurrent first deposits can never
//! both create a session, and no extension is ever lost to a stale read.
//!
//! Liveness is computed at query time against a supplied instant. Lapsed
//! sessions stay in storage as history; a later deposit starts a fresh
//! window with the deposit count reset to 1.

use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use recyfi_core::{DeviceKey, GrantConfig, LedgerError, Result, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-device-key serialization guard.
///
/// One async mutex per key, created on first use. Guards are never evicted;
/// the map grows with the distinct-device count, which is bounded by the
/// session table itself.
#[derive(Default)]
struct KeyLocks {
    locks: Mutex<HashMap<DeviceKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
    fn lock_for(&self, key: &DeviceKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Owns the extend-or-create state machine per device key.
pub struct SessionManager {
    store: Arc<dyn LedgerStore>,
    grants: GrantConfig,
    key_locks: KeyLocks,
}

impl SessionManager {
    /// Create a manager over the given store and grant durations.
    pub fn new(store: Arc<dyn LedgerStore>, grants: GrantConfig) -> Self {
        Self {
            store,
            grants,
            key_locks: KeyLocks::default(),
        }
    }

    /// Grant durations this manager applies.
    pub fn grants(&self) -> GrantConfig {
        self.grants
    }

    /// Apply one deposit to the session for `key`.
    ///
    /// No session, or a lapsed one: a fresh window is created with
    /// `start = now`, `end = now + base_grant`, `deposit_count = 1`, and
    /// `true` is returned. An active session keeps compounding: the
    /// extension is added to the stored `end`, not to `now`, and
    /// `deposit_count` is bumped.
    pub async fn extend_or_create(
        &self,
        key: &DeviceKey,
        now: DateTime<Utc>,
    ) -> Result<(Session, bool)> {
        let lock = self.key_locks.lock_for(key);
        let _guard = lock.lock().await;

        let existing = self.store.session(key).await?;
        let (session, created) = match existing {
            Some(mut session) if session.is_active(now) => {
                session.end += self.grants.extension_grant();
                session.deposit_count += 1;
                (session, false)
            }
            _ => (
                Session {
                    key: key.clone(),
                    start: now,
                    end: now + self.grants.base_grant(),
                    deposit_count: 1,
                },
                true,
            ),
        };

        self.store.put_session(session.clone()).await?;
        debug!(
            device = %key,
            created,
            end = %session.end,
            deposits = session.deposit_count,
            "session window updated"
        );
        Ok((session, created))
    }

    /// Extension-only path: extend an active session or report not-found.
    ///
    /// Unlike `extend_or_create` this never starts a fresh window; a lapsed
    /// or absent session is a `NotFound` error for the caller to surface.
    pub async fn extend_active(&self, key: &DeviceKey, now: DateTime<Utc>) -> Result<Session> {
        let lock = self.key_locks.lock_for(key);
        let _guard = lock.lock().await;

        let mut session = self
            .store
            .session(key)
            .await?
            .filter(|s| s.is_active(now))
            .ok_or_else(|| {
                LedgerError::not_found(format!("no active session for {key}"))
            })?;

        session.end += self.grants.extension_grant();
        session.deposit_count += 1;
        self.store.put_session(session.clone()).await?;
        Ok(session)
    }

    /// The session for `key` iff it is active at `now`.
    ///
    /// A lapsed session is invisible here but remains in storage for audit.
    pub async fn find_active(
        &self,
        key: &DeviceKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        Ok(self.store.session(key).await?.filter(|s| s.is_active(now)))
    }

    /// All sessions active at `now`, ordered by `end` descending.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Session>> {
        let mut active: Vec<Session> = self
            .store
            .sessions()
            .await?
            .into_iter()
            .filter(|s| s.is_active(now))
            .collect();
        active.sort_by(|a, b| b.end.cmp(&a.end));
        Ok(active)
    }

    /// Distinct device keys ever recorded, live or lapsed.
    pub async fn distinct_device_count(&self) -> Result<usize> {
        self.store.distinct_device_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn minutes(m: i64) -> DateTime<Utc> {
        at(m * 60)
    }

    fn key(s: &str) -> DeviceKey {
        DeviceKey::parse(s).unwrap()
    }

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemoryLedger::new()), GrantConfig::default())
    }

    #[tokio::test]
    async fn deposit_sequence_compounds_then_revives() {
        // Base 15m, extension 5m. Deposits at t=0, t=10m, t=25m.
        let manager = manager();
        let aa = key("AA");

        let (s, created) = manager.extend_or_create(&aa, minutes(0)).await.unwrap();
        assert!(created);
        assert_eq!(s.start, minutes(0));
        assert_eq!(s.end, minutes(15));
        assert_eq!(s.deposit_count, 1);

        // Extension is added to the stored end, not to now: 15m + 5m = 20m.
        let (s, created) = manager.extend_or_create(&aa, minutes(10)).await.unwrap();
        assert!(!created);
        assert_eq!(s.start, minutes(0));
        assert_eq!(s.end, minutes(20));
        assert_eq!(s.deposit_count, 2);

        // Lapsed at 20m; deposit at 25m starts a fresh window, count resets.
        let (s, created) = manager.extend_or_create(&aa, minutes(25)).await.unwrap();
        assert!(created);
        assert_eq!(s.start, minutes(25));
        assert_eq!(s.end, minutes(40));
        assert_eq!(s.deposit_count, 1);
    }

    #[tokio::test]
    async fn lapsed_session_is_invisible_but_kept() {
        let manager = manager();
        let aa = key("AA");
        manager.extend_or_create(&aa, minutes(0)).await.unwrap();

        assert!(manager.find_active(&aa, minutes(14)).await.unwrap().is_some());
        assert!(manager.find_active(&aa, minutes(15)).await.unwrap().is_none());
        assert!(manager.list_active(minutes(15)).await.unwrap().is_empty());

        // Still counted as a known device
        assert_eq!(manager.distinct_device_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_active_orders_by_end_descending() {
        let manager = manager();
        manager.extend_or_create(&key("AA"), minutes(0)).await.unwrap();
        manager.extend_or_create(&key("BB"), minutes(2)).await.unwrap();
        manager.extend_or_create(&key("CC"), minutes(1)).await.unwrap();

        let active = manager.list_active(minutes(3)).await.unwrap();
        let ends: Vec<_> = active.iter().map(|s| s.end).collect();
        assert_eq!(ends, vec![minutes(17), minutes(16), minutes(15)]);
    }

    #[tokio::test]
    async fn extend_active_rejects_lapsed_sessions() {
        let manager = manager();
        let aa = key("AA");
        manager.extend_or_create(&aa, minutes(0)).await.unwrap();

        let s = manager.extend_active(&aa, minutes(5)).await.unwrap();
        assert_eq!(s.end, minutes(20));
        assert_eq!(s.deposit_count, 2);

        let err = manager.extend_active(&aa, minutes(30)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
        let err = manager.extend_active(&key("ZZ"), minutes(0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn end_never_decreases_across_extensions() {
        let manager = manager();
        let aa = key("AA");
        let (mut prev, _) = manager.extend_or_create(&aa, minutes(0)).await.unwrap();
        for i in 1..10 {
            let (s, created) = manager
                .extend_or_create(&aa, minutes(0) + Duration::seconds(i))
                .await
                .unwrap();
            assert!(!created);
            assert!(s.end > prev.end);
            prev = s;
        }
        assert_eq!(prev.deposit_count, 10);
        assert_eq!(prev.end, minutes(15) + Duration::minutes(45));
    }
}
