//! Ledger record types.
//!
//! Three persisted shapes: one `Session` row per device key, append-only
//! `DepositEvent` rows, and one `DailyAggregate` row per UTC calendar day.
//! Session liveness is derived at query time from a supplied instant; nothing
//! here consults a wall clock.

use crate::error::LedgerError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a client device (a hardware address in practice).
///
/// Used as the session partition key; always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Parse a device key from client input, rejecting blank values.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation("deviceKey is required"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derived session liveness, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// `now < end`
    Active,
    /// `end <= now`; the row is kept as history and may later be revived
    Expired,
}

/// One access session per device key.
///
/// `end` only ever moves forward across extensions. A lapsed session is not
/// deleted; a later deposit replaces it with a fresh window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Device key this session belongs to
    pub key: DeviceKey,
    /// Instant the session was first created
    pub start: DateTime<Utc>,
    /// Instant the session lapses; monotonically non-decreasing
    pub end: DateTime<Utc>,
    /// Deposits attributed to this session since creation
    pub deposit_count: u32,
}

impl Session {
    /// Derived state relative to the supplied instant.
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if now < self.end {
            SessionState::Active
        } else {
            SessionState::Expired
        }
    }

    /// True iff the session has not lapsed at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == SessionState::Active
    }
}

/// Immutable record of one physical deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    /// Monotonically increasing identifier, unique, starting at 1
    pub id: u64,
    /// Device that triggered the deposit
    pub device_key: DeviceKey,
    /// Instant the deposit was recorded
    pub timestamp: DateTime<Utc>,
}

/// Per-calendar-day rollup counters derived from deposit events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// UTC calendar day this row covers
    pub day: NaiveDate,
    /// Deposits recorded on this day (absent an administrative reset)
    pub total_deposits: u64,
    /// Sessions created on this day
    pub total_sessions_created: u64,
    /// Estimated CO2 savings, follows `total_deposits`
    pub co2_saved_kg: f64,
}

impl DailyAggregate {
    /// Zero-valued row for a day that has seen no deposits yet.
    pub fn zero(day: NaiveDate) -> Self {
        Self {
            day,
            total_deposits: 0,
            total_sessions_created: 0,
            co2_saved_kg: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn device_key_rejects_blank_input() {
        assert!(DeviceKey::parse("").is_err());
        assert!(DeviceKey::parse("   ").is_err());
        assert_eq!(
            DeviceKey::parse("  AA:BB:CC:DD:EE:FF ").unwrap().as_str(),
            "AA:BB:CC:DD:EE:FF"
        );
    }

    #[test]
    fn session_state_is_derived_from_end() {
        let session = Session {
            key: DeviceKey::parse("AA").unwrap(),
            start: at(0),
            end: at(900),
            deposit_count: 1,
        };
        assert_eq!(session.state(at(899)), SessionState::Active);
        assert_eq!(session.state(at(900)), SessionState::Expired);
        assert_eq!(session.state(at(901)), SessionState::Expired);
    }
}
