//! Grant durations and fixed domain constants.

use crate::error::LedgerError;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Estimated CO2 savings per deposited bottle, in kilograms.
pub const CO2_PER_DEPOSIT_KG: f64 = 0.082;

/// Upper bound on a configured grant duration (one year, in seconds).
///
/// Grants above this are configuration mistakes; the bound also keeps the
/// seconds safely inside the signed range the duration math uses.
pub const MAX_GRANT_SECS: u64 = 366 * 24 * 60 * 60;

/// TTL durations applied by the session state machine.
///
/// The base grant starts a fresh window on the first deposit; the extension
/// grant is added to the stored `end` on each further deposit while the
/// window is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConfig {
    /// Seconds granted when a session is newly created
    pub base_grant_secs: u64,
    /// Seconds added to an active session's end per subsequent deposit
    pub extension_grant_secs: u64,
}

impl GrantConfig {
    /// Validate and construct a grant configuration.
    pub fn new(base_grant_secs: u64, extension_grant_secs: u64) -> Result<Self, LedgerError> {
        let config = Self {
            base_grant_secs,
            extension_grant_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Both durations must be strictly positive and at most a year.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.base_grant_secs == 0 {
            return Err(LedgerError::validation("base grant must be positive"));
        }
        if self.extension_grant_secs == 0 {
            return Err(LedgerError::validation("extension grant must be positive"));
        }
        if self.base_grant_secs > MAX_GRANT_SECS {
            return Err(LedgerError::validation(format!(
                "base grant exceeds the maximum of {MAX_GRANT_SECS} seconds"
            )));
        }
        if self.extension_grant_secs > MAX_GRANT_SECS {
            return Err(LedgerError::validation(format!(
                "extension grant exceeds the maximum of {MAX_GRANT_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// Base grant as a chrono duration.
    pub fn base_grant(&self) -> Duration {
        Duration::seconds(self.base_grant_secs as i64)
    }

    /// Extension grant as a chrono duration.
    pub fn extension_grant(&self) -> Duration {
        Duration::seconds(self.extension_grant_secs as i64)
    }
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            base_grant_secs: 15 * 60,
            extension_grant_secs: 5 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grants_match_portal_policy() {
        let config = GrantConfig::default();
        assert_eq!(config.base_grant(), Duration::minutes(15));
        assert_eq!(config.extension_grant(), Duration::minutes(5));
    }

    #[test]
    fn zero_durations_are_rejected() {
        assert!(GrantConfig::new(0, 300).is_err());
        assert!(GrantConfig::new(900, 0).is_err());
        assert!(GrantConfig::new(900, 300).is_ok());
    }

    #[test]
    fn oversized_durations_are_rejected_at_validation() {
        // Values past the bound would wrap to negative durations in the
        // signed seconds math; they must fail at load instead.
        assert!(GrantConfig::new(u64::MAX, 300).is_err());
        assert!(GrantConfig::new(900, u64::MAX).is_err());
        assert!(GrantConfig::new(MAX_GRANT_SECS + 1, 300).is_err());
        assert!(GrantConfig::new(MAX_GRANT_SECS, MAX_GRANT_SECS).is_ok());
    }
}
