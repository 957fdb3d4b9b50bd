//! RecyFi core domain layer
//!
//! Pure types shared by the ledger and the HTTP server: device identifiers,
//! session and deposit records, daily rollups, the error taxonomy, the
//! injectable clock, and grant configuration. This crate performs no I/O.

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GrantConfig, CO2_PER_DEPOSIT_KG, MAX_GRANT_SECS};
pub use error::{LedgerError, Result};
pub use types::{DailyAggregate, DepositEvent, DeviceKey, Session, SessionState};
