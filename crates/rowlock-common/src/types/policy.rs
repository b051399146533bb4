//! WorkerPolicy - backoff and reward weights carried by each worker
//!
//! The policy is fixed when a worker is created and copied unchanged into
//! every clone of that worker.

use serde::{Deserialize, Serialize};

/// Default rollback cost weight
pub const DEFAULT_BETA: f64 = 5.0;

/// Default externality weight applied to the population rollback rate
pub const DEFAULT_GAMMA: f64 = 0.3;

/// Default backoff after a collision, in milliseconds
pub const DEFAULT_DELTA_MS: u64 = 10;

/// Memory-1 tit-for-tat backoff plus responsibility-aware reward weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerPolicy {
    /// β: cost of a local rollback
    pub beta: f64,
    /// γ: cost per unit of population average rollback
    pub gamma: f64,
    /// δ: pause before the attempt that follows a collision
    pub delta_ms: u64,
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self {
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            delta_ms: DEFAULT_DELTA_MS,
        }
    }
}

impl WorkerPolicy {
    pub fn new(beta: f64, gamma: f64, delta_ms: u64) -> Self {
        Self {
            beta,
            gamma,
            delta_ms,
        }
    }

    /// Responsibility-aware reward for one attempt:
    ///
    /// ```text
    /// r = -latency_ms - β·rollback - γ·avg_rollback
    /// ```
    #[inline]
    pub fn reward(&self, latency_ms: u64, rollback: u8, avg_rollback: f64) -> f64 {
        -(latency_ms as f64) - self.beta * f64::from(rollback) - self.gamma * avg_rollback
    }
}
