//! # Rowlock Common
//!
//! Shared types and errors for the Rowlock contention engine and its shells.
//!
//! ## Core Types
//!
//! - [`WorkerPolicy`]: backoff δ and reward weights β, γ
//! - [`AttemptOutcome`]/[`AttemptStatus`]: result of one lock attempt
//! - [`RewardMetrics`]: per-instance reward report read by the fleet orchestrator
//! - [`LockReply`]/[`BalanceReply`]: transport wire bodies

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{parse_var, ConfigError, LockError, Result, RowlockError};
pub use types::{
    attempt::{AttemptOutcome, AttemptStatus, BalanceReply, LockReply},
    metrics::{RewardMetrics, WorkerSnapshot},
    policy::{WorkerPolicy, DEFAULT_BETA, DEFAULT_DELTA_MS, DEFAULT_GAMMA},
};

/// Rowlock version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fraction of the population culled and cloned each epoch (one in five)
pub const SELECTION_DIVISOR: usize = 5;

/// Scaling never drives a population below this size
pub const MIN_POPULATION: usize = 1;

/// Simulated transaction work while a row is held, in milliseconds
pub const DEFAULT_CRITICAL_SECTION_MS: u64 = 5;

/// Bounded wait for the next request before rechecking liveness, in milliseconds
pub const DEFAULT_IDLE_POLL_MS: u64 = 1000;

/// Default controller epoch length in seconds
pub const DEFAULT_EPOCH_SECS: u64 = 10;

/// Selection size for a population of `n`: bottom/top 20%, at least one
#[inline]
pub fn selection_size(n: usize) -> usize {
    (n / SELECTION_DIVISOR).max(MIN_POPULATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_size() {
        assert_eq!(selection_size(1), 1);
        assert_eq!(selection_size(4), 1);
        assert_eq!(selection_size(5), 1);
        assert_eq!(selection_size(10), 2);
        assert_eq!(selection_size(14), 2);
        assert_eq!(selection_size(15), 3);
    }
}
