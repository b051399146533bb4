//! Run summary: counts, collision rates, latency percentiles, throughput

use std::fmt;
use std::time::Duration;

use rowlock_common::AttemptStatus;

/// One answered (or failed) request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Lock { status: AttemptStatus, latency_ms: u64 },
    Balance { latency_ms: u64 },
    Failed,
}

/// Nearest-rank percentile of a sorted slice; 0 when empty
pub fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Requests that got an answer
    pub total: usize,
    pub locks: usize,
    pub reads: usize,
    pub failures: usize,
    pub collisions: usize,
    /// Collisions per 100 lock requests
    pub collision_pct: f64,
    /// Collisions per 10 000 lock requests
    pub rollback_per_10k: f64,
    /// Lock latency percentiles in ms
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    /// Answered requests per second
    pub throughput: f64,
}

impl Summary {
    pub fn from_samples(samples: &[Sample], elapsed: Duration) -> Self {
        let mut lock_latencies = Vec::new();
        let (mut reads, mut failures, mut collisions) = (0, 0, 0);

        for sample in samples {
            match *sample {
                Sample::Lock { status, latency_ms } => {
                    lock_latencies.push(latency_ms);
                    if status.is_collision() {
                        collisions += 1;
                    }
                }
                Sample::Balance { .. } => reads += 1,
                Sample::Failed => failures += 1,
            }
        }
        lock_latencies.sort_unstable();

        let locks = lock_latencies.len();
        let rate = |scale: f64| {
            if locks == 0 {
                0.0
            } else {
                collisions as f64 / locks as f64 * scale
            }
        };
        let total = locks + reads;
        let secs = elapsed.as_secs_f64();

        Self {
            total,
            locks,
            reads,
            failures,
            collisions,
            collision_pct: rate(100.0),
            rollback_per_10k: rate(10_000.0),
            p50: percentile(&lock_latencies, 50.0),
            p95: percentile(&lock_latencies, 95.0),
            p99: percentile(&lock_latencies, 99.0),
            throughput: if secs > 0.0 { total as f64 / secs } else { 0.0 },
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total requests: {} ({} locks, {} reads, {} failed)",
            self.total, self.locks, self.reads, self.failures
        )?;
        writeln!(f, "Dead-lock rate: {:.2}%", self.collision_pct)?;
        writeln!(f, "Rollback rate (/10k): {:.0}", self.rollback_per_10k)?;
        writeln!(
            f,
            "Latency p50/p95/p99: {}/{}/{} ms",
            self.p50, self.p95, self.p99
        )?;
        write!(f, "Throughput: {:.1} req/s", self.throughput)
    }
}
