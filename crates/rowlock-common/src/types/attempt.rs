//! AttemptOutcome - result of one worker's try-acquire on one row
//!
//! A collision is a first-class outcome, never an error. The transport shell
//! serialises [`LockReply`] as `{"result": "OK" | "COLLISION", "latency_ms": n}`.

use serde::{Deserialize, Serialize};

/// Outcome of a single non-blocking lock attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    /// Row acquired, critical section ran, row released
    Ok,
    /// Row already held by another worker
    Collision,
}

impl AttemptStatus {
    /// Rollback indicator used by the reward: 0 on success, 1 on collision
    #[inline]
    pub fn rollback(self) -> u8 {
        match self {
            AttemptStatus::Ok => 0,
            AttemptStatus::Collision => 1,
        }
    }

    pub fn from_acquired(acquired: bool) -> Self {
        if acquired {
            AttemptStatus::Ok
        } else {
            AttemptStatus::Collision
        }
    }

    pub fn is_collision(self) -> bool {
        matches!(self, AttemptStatus::Collision)
    }
}

/// Instrumentation produced by every attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    /// Name of the worker that made the attempt
    pub worker: String,
    /// Row index
    pub row: usize,
    /// OK or COLLISION
    pub status: AttemptStatus,
    /// Whole milliseconds from try-acquire to release (or to the failed try)
    pub latency_ms: u64,
    /// Reward credited to the worker for this attempt
    pub reward: f64,
}

impl AttemptOutcome {
    pub fn rollback(&self) -> u8 {
        self.status.rollback()
    }
}

/// Wire body returned by the lock endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockReply {
    pub result: AttemptStatus,
    pub latency_ms: u64,
}

impl From<&AttemptOutcome> for LockReply {
    fn from(outcome: &AttemptOutcome) -> Self {
        Self {
            result: outcome.status,
            latency_ms: outcome.latency_ms,
        }
    }
}

/// Wire body returned by the balance endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReply {
    pub balance: i64,
    pub latency_ms: u64,
}
