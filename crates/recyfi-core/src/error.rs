//! Unified error taxonomy for ledger operations.
//!
//! Four categories, mirrored by the HTTP layer: validation and not-found are
//! client errors detected at the boundary, storage errors propagate unmodified
//! as server errors, and gateway errors are logged but never surfaced to the
//! caller once the ledger has committed.

use serde::{Deserialize, Serialize};

/// Result alias used throughout the ledger crates.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for all ledger operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum LedgerError {
    /// Missing or malformed input, rejected before touching the ledger.
    #[error("Invalid: {message}")]
    Validation {
        /// What was invalid about the input
        message: String,
    },

    /// Query target does not exist or has lapsed.
    #[error("Not found: {message}")]
    NotFound {
        /// What was not found
        message: String,
    },

    /// The ledger store failed to read or write.
    #[error("Storage error: {message}")]
    Storage {
        /// What the store failed to do
        message: String,
    },

    /// The access gateway call failed or timed out.
    #[error("Gateway error: {message}")]
    Gateway {
        /// What the gateway failed to do
        message: String,
    },
}

impl LedgerError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a gateway error
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = LedgerError::validation("deviceKey is required");
        assert_eq!(err.to_string(), "Invalid: deviceKey is required");

        let err = LedgerError::not_found("no active session for AA");
        assert_eq!(err.to_string(), "Not found: no active session for AA");
    }
}
