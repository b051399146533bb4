//! Epoch-scoped rollback statistics
//!
//! Every worker reads the population mean rollback rate before crediting its
//! reward and reports its own outcome afterwards. The controller clears the
//! window at each epoch boundary. One lock guards the window; readers get a
//! snapshot, not a point-in-time consistent view across workers.

use parking_lot::Mutex;
use rowlock_common::{LockError, Result};
use serde::{Deserialize, Serialize};

/// Summary of the current (or a just-closed) epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RollbackSnapshot {
    /// Attempts reported since the last reset
    pub samples: u64,
    /// Of those, how many collided
    pub rollbacks: u64,
    /// rollbacks / samples, 0 when empty
    pub average: f64,
}

#[derive(Debug, Default)]
struct EpochWindow {
    outcomes: Vec<u8>,
    rollbacks: u64,
}

impl EpochWindow {
    fn snapshot(&self) -> RollbackSnapshot {
        let samples = self.outcomes.len() as u64;
        RollbackSnapshot {
            samples,
            rollbacks: self.rollbacks,
            average: if samples == 0 {
                0.0
            } else {
                self.rollbacks as f64 / samples as f64
            },
        }
    }
}

/// Shared rollback aggregator
#[derive(Debug, Default)]
pub struct RewardAggregator {
    window: Mutex<EpochWindow>,
}

impl RewardAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome (0 = committed, 1 = rolled back)
    pub fn report_rollback(&self, value: u8) -> Result<()> {
        if value > 1 {
            return Err(LockError::RollbackValue(value).into());
        }
        let mut window = self.window.lock();
        window.outcomes.push(value);
        window.rollbacks += u64::from(value);
        Ok(())
    }

    /// Mean rollback rate of the current epoch, 0 if nothing was reported
    pub fn average_rollback(&self) -> f64 {
        self.window.lock().snapshot().average
    }

    /// Number of outcomes in the current epoch
    pub fn epoch_len(&self) -> usize {
        self.window.lock().outcomes.len()
    }

    pub fn snapshot(&self) -> RollbackSnapshot {
        self.window.lock().snapshot()
    }

    /// Clear the window, returning the summary of the epoch just closed
    pub fn reset_epoch(&self) -> RollbackSnapshot {
        let closed = std::mem::take(&mut *self.window.lock());
        closed.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_average_after_reset_is_zero() {
        let agg = RewardAggregator::new();
        agg.report_rollback(1).unwrap();
        agg.reset_epoch();
        assert_eq!(agg.average_rollback(), 0.0);
        assert_eq!(agg.epoch_len(), 0);
    }

    #[test]
    fn test_average_of_reported_outcomes() {
        let agg = RewardAggregator::new();
        for v in [1, 0, 1, 1] {
            agg.report_rollback(v).unwrap();
        }
        assert_eq!(agg.average_rollback(), 0.75);

        let closed = agg.reset_epoch();
        assert_eq!(closed.samples, 4);
        assert_eq!(closed.rollbacks, 3);
        assert_eq!(closed.average, 0.75);
    }

    #[test]
    fn test_rejects_non_binary_outcome() {
        let agg = RewardAggregator::new();
        assert!(agg.report_rollback(2).is_err());
        assert_eq!(agg.epoch_len(), 0);
    }

    #[test]
    fn test_concurrent_reporters() {
        let agg = Arc::new(RewardAggregator::new());
        let threads: Vec<_> = (0..4)
            .map(|i| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for n in 0..500u32 {
                        agg.report_rollback(u8::from((n + i) % 2 == 0)).unwrap();
                        let avg = agg.average_rollback();
                        assert!((0.0..=1.0).contains(&avg));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let snap = agg.snapshot();
        assert_eq!(snap.samples, 2000);
        assert_eq!(snap.rollbacks, 1000);
        assert_eq!(snap.average, 0.5);
    }
}
