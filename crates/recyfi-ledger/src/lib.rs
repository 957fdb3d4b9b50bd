//! RecyFi access-session ledger
//!
//! The core of the system: a per-device TTL record atomically created or
//! extended in response to deposit events, queried for liveness, and rolled
//! up into daily counters.
//!
//! # Architecture
//!
//! - `store` - the pluggable `LedgerStore` contract (sessions, deposit
//!   events, daily aggregates)
//! - `memory` - reference in-memory store with optional JSON snapshot
//!   mirroring
//! - `session` - `SessionManager`, the extend-or-create state machine with
//!   per-device-key serialization
//! - `deposit` - `DepositRecorder`, append-then-extend-then-rollup
//! - `stats` - `StatsAggregator`, per-day rollups and realtime counters
//!
//! Liveness is always computed at query time relative to a supplied instant;
//! there is no background sweep. The store is the single shared mutable
//! resource; everything above it holds only configuration.

#![forbid(unsafe_code)]

pub mod deposit;
pub mod memory;
pub mod session;
pub mod stats;
pub mod store;

pub use deposit::{DepositReceipt, DepositRecorder};
pub use memory::MemoryLedger;
pub use session::SessionManager;
pub use stats::{RealtimeStats, StatsAggregator};
pub use store::LedgerStore;

// Re-export the domain layer for downstream convenience
pub use recyfi_core::{
    Clock, DailyAggregate, DepositEvent, DeviceKey, GrantConfig, LedgerError, ManualClock, Result,
    Session, SessionState, SystemClock, CO2_PER_DEPOSIT_KG,
};
