//! Error types for the Rowlock system
//!
//! Contention is not an error: a failed non-blocking acquisition is reported as
//! [`AttemptStatus::Collision`](crate::AttemptStatus::Collision). The variants
//! here cover bad input, configuration, and broken invariants.

use std::str::FromStr;

use thiserror::Error;

/// Result type alias using RowlockError
pub type Result<T> = std::result::Result<T, RowlockError>;

/// Unified error type for Rowlock operations
#[derive(Debug, Error)]
pub enum RowlockError {
    // Lock table / request source errors
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // A documented invariant no longer holds
    #[error("Invariant violated: {0}")]
    Invariant(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),

    // Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Errors raised at the lock table and request-source boundary
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("Unknown row {row} (table has {rows} rows)")]
    UnknownRow { row: usize, rows: usize },

    #[error("Request queue is full")]
    QueueFull,

    #[error("Request source closed")]
    SourceClosed,

    #[error("Rollback value must be 0 or 1, got {0}")]
    RollbackValue(u8),
}

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {minimum}, got {actual}")]
    TooSmall {
        field: &'static str,
        minimum: u64,
        actual: u64,
    },

    #[error("{field} must be a finite non-negative number, got {actual}")]
    InvalidWeight { field: &'static str, actual: f64 },

    #[error("{field} must be a finite positive number, got {actual}")]
    NotPositive { field: &'static str, actual: f64 },

    #[error("{field} must be within [0, 1], got {actual}")]
    OutOfRange { field: &'static str, actual: f64 },

    #[error("Invalid value for {key}: {value}")]
    Unparseable { key: String, value: String },
}

/// Parse `key` from `lookup` (usually the process environment).
///
/// `Ok(None)` when the key is unset; surrounding whitespace is ignored.
pub fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> std::result::Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Unparseable {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

impl From<serde_json::Error> for RowlockError {
    fn from(err: serde_json::Error) -> Self {
        RowlockError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RowlockError {
    fn from(err: std::io::Error) -> Self {
        RowlockError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for RowlockError {
    fn from(err: anyhow::Error) -> Self {
        RowlockError::Internal(err.to_string())
    }
}
