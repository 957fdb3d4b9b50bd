//! Reference in-memory store with optional JSON snapshot mirroring.
//!
//! All three collections live behind one `parking_lot::RwLock`; every trait
//! method takes the lock once, so read-then-write within a call is atomic.
//! When a snapshot path is configured the state is cloned under the lock and
//! written after it is released, so a slow disk never stalls other store
//! calls. Writers are versioned: a snapshot is skipped when a newer one has
//! already been persisted, so concurrent mutations cannot roll the file
//! back. The file itself goes to a sibling temp path and is renamed into
//! place, so a crash never leaves a torn snapshot on disk.

use crate::store::LedgerStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use recyfi_core::{DailyAggregate, DepositEvent, DeviceKey, LedgerError, Result, Session};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Serializable snapshot of the ledger contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerState {
    sessions: BTreeMap<DeviceKey, Session>,
    deposits: Vec<DepositEvent>,
    aggregates: BTreeMap<NaiveDate, DailyAggregate>,
    next_deposit_id: u64,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            sessions: BTreeMap::new(),
            deposits: Vec::new(),
            aggregates: BTreeMap::new(),
            next_deposit_id: 1,
        }
    }
}

/// In-memory ledger store, the reference `LedgerStore` implementation.
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
    snapshot_path: Option<PathBuf>,
    /// Mutation counter, bumped under the state write lock
    version: AtomicU64,
    /// Version of the last snapshot persisted to disk
    persisted: Mutex<u64>,
}

impl MemoryLedger {
    /// Create an empty store with no durable mirror.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            snapshot_path: None,
            version: AtomicU64::new(0),
            persisted: Mutex::new(0),
        }
    }

    /// Create a store mirrored to a JSON snapshot file.
    ///
    /// An existing snapshot is loaded; a missing one starts empty. A present
    /// but unreadable snapshot is a storage error rather than silent data
    /// loss.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| LedgerError::storage(format!("read snapshot: {e}")))?;
            let state: LedgerState = serde_json::from_str(&raw)
                .map_err(|e| LedgerError::storage(format!("parse snapshot: {e}")))?;
            info!(
                path = %path.display(),
                sessions = state.sessions.len(),
                deposits = state.deposits.len(),
                "loaded ledger snapshot"
            );
            state
        } else {
            LedgerState::default()
        };

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
            version: AtomicU64::new(0),
            persisted: Mutex::new(0),
        })
    }

    /// Run a mutation under the write lock, then mirror the new state.
    ///
    /// The clone happens under the lock, the disk write after it. The
    /// persisted-version gate keeps an overtaken writer from clobbering a
    /// newer snapshot with an older state.
    fn mutate<T>(&self, f: impl FnOnce(&mut LedgerState) -> T) -> Result<T> {
        let (out, version, snapshot) = {
            let mut state = self.state.write();
            let out = f(&mut state);
            let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
            let snapshot = self.snapshot_path.is_some().then(|| state.clone());
            (out, version, snapshot)
        };

        if let (Some(path), Some(snapshot)) = (&self.snapshot_path, snapshot) {
            let mut persisted = self.persisted.lock();
            if *persisted < version {
                write_snapshot(path, &snapshot)?;
                *persisted = version;
            }
        }
        Ok(out)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn write_snapshot(path: &Path, state: &LedgerState) -> Result<()> {
    let raw = serde_json::to_string_pretty(state)
        .map_err(|e| LedgerError::storage(format!("encode snapshot: {e}")))?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, raw)
        .map_err(|e| LedgerError::storage(format!("write snapshot: {e}")))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| LedgerError::storage(format!("commit snapshot: {e}")))?;
    debug!(path = %path.display(), "ledger snapshot written");
    Ok(())
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn session(&self, key: &DeviceKey) -> Result<Option<Session>> {
        Ok(self.state.read().sessions.get(key).cloned())
    }

    async fn put_session(&self, session: Session) -> Result<()> {
        self.mutate(|state| {
            state.sessions.insert(session.key.clone(), session);
        })
    }

    async fn sessions(&self) -> Result<Vec<Session>> {
        Ok(self.state.read().sessions.values().cloned().collect())
    }

    async fn distinct_device_count(&self) -> Result<usize> {
        Ok(self.state.read().sessions.len())
    }

    async fn append_deposit(
        &self,
        key: &DeviceKey,
        timestamp: DateTime<Utc>,
    ) -> Result<DepositEvent> {
        self.mutate(|state| {
            let event = DepositEvent {
                id: state.next_deposit_id,
                device_key: key.clone(),
                timestamp,
            };
            state.next_deposit_id += 1;
            state.deposits.push(event.clone());
            event
        })
    }

    async fn recent_deposits(&self, limit: usize) -> Result<Vec<DepositEvent>> {
        let state = self.state.read();
        Ok(state.deposits.iter().rev().take(limit).cloned().collect())
    }

    async fn deposits_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let state = self.state.read();
        Ok(state
            .deposits
            .iter()
            .filter(|e| e.timestamp >= since)
            .count())
    }

    async fn total_deposits(&self) -> Result<u64> {
        Ok(self.state.read().deposits.len() as u64)
    }

    async fn aggregate(&self, day: NaiveDate) -> Result<Option<DailyAggregate>> {
        Ok(self.state.read().aggregates.get(&day).cloned())
    }

    async fn apply_aggregate_delta(
        &self,
        day: NaiveDate,
        deposits: u64,
        sessions_created: u64,
        co2_kg: f64,
    ) -> Result<DailyAggregate> {
        self.mutate(|state| {
            let row = state
                .aggregates
                .entry(day)
                .or_insert_with(|| DailyAggregate::zero(day));
            row.total_deposits += deposits;
            row.total_sessions_created += sessions_created;
            row.co2_saved_kg += co2_kg;
            row.clone()
        })
    }

    async fn aggregates_in_window(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        let state = self.state.read();
        Ok(state
            .aggregates
            .range(from..=to)
            .rev()
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn remove_aggregate(&self, day: NaiveDate) -> Result<()> {
        self.mutate(|state| {
            state.aggregates.remove(&day);
        })
    }
}
