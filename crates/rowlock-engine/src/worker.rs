//! Contending worker: pulls requests, attempts row locks, accrues reward
//!
//! ## Per-attempt sequence
//!
//! ```text
//! 1. if last attempt collided: pause δ            (memory-1 tit-for-tat)
//! 2. t0 = now; try_acquire(row)
//! 3. acquired -> hold, apply payload, release      rollback = 0
//!    else                                          rollback = 1
//! 4. latency = whole ms since t0
//! 5. last_collision = rollback == 1
//! 6. avg = aggregator.average_rollback()
//! 7. r = -latency - β·rollback - γ·avg
//! 8. cumulative += r
//! 9. aggregator.report_rollback(rollback)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rowlock_common::{
    AttemptOutcome, AttemptStatus, LockError, Result, WorkerPolicy, WorkerSnapshot,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::delay::{Delay, Pause};
use crate::fitness::RewardAggregator;
use crate::ledger::Ledger;
use crate::source::{LockRequest, RequestSource};
use crate::table::ResourceLockTable;
use crate::telemetry::EngineMetrics;

/// Shared components every worker references but never owns
#[derive(Clone)]
pub struct WorkerContext {
    pub table: Arc<ResourceLockTable>,
    pub source: RequestSource,
    pub aggregator: Arc<RewardAggregator>,
    pub ledger: Arc<Ledger>,
    pub delay: Arc<dyn Delay>,
    pub metrics: Arc<EngineMetrics>,
    /// Simulated transaction work while a row is held
    pub critical_section: Duration,
    /// Bounded wait for the next request
    pub idle_poll: Duration,
}

/// One member of the population
#[derive(Debug)]
pub struct Worker {
    name: String,
    lineage: String,
    policy: WorkerPolicy,
    alive: AtomicBool,
    last_collision: AtomicBool,
    cumulative_reward: Mutex<f64>,
}

impl Worker {
    /// Fresh worker: no reward, no previous collision
    pub fn new(lineage: impl Into<String>, seq: u64, policy: WorkerPolicy) -> Self {
        let lineage = lineage.into();
        Self {
            name: format!("{lineage}-{seq}"),
            lineage,
            policy,
            alive: AtomicBool::new(true),
            last_collision: AtomicBool::new(false),
            cumulative_reward: Mutex::new(0.0),
        }
    }

    /// New worker with this worker's policy and lineage; history is not inherited
    pub fn clone_fresh(&self, seq: u64) -> Self {
        let mut child = Self::new(self.lineage.clone(), seq, self.policy);
        child.name = format!("{}-clone-{seq}", self.lineage);
        child
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lineage(&self) -> &str {
        &self.lineage
    }

    pub fn policy(&self) -> WorkerPolicy {
        self.policy
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Ask the worker to stop at its next suspension point
    pub fn terminate(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn last_collision(&self) -> bool {
        self.last_collision.load(Ordering::Acquire)
    }

    pub fn cumulative_reward(&self) -> f64 {
        *self.cumulative_reward.lock()
    }

    pub(crate) fn credit(&self, reward: f64) {
        *self.cumulative_reward.lock() += reward;
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            name: self.name.clone(),
            beta: self.policy.beta,
            gamma: self.policy.gamma,
            delta_ms: self.policy.delta_ms,
            cumulative_reward: self.cumulative_reward(),
            last_collision: self.last_collision(),
            alive: self.is_alive(),
        }
    }

    /// One full attempt on `row`. A collision is an `Ok` outcome.
    pub async fn attempt(
        &self,
        ctx: &WorkerContext,
        row: usize,
        amount: Option<i64>,
    ) -> Result<AttemptOutcome> {
        ctx.table.check_row(row)?;

        if self.last_collision() {
            ctx.delay
                .pause(Pause::Backoff, Duration::from_millis(self.policy.delta_ms))
                .await;
        }

        let start = Instant::now();
        let guard = ctx.table.try_lock(row)?;
        let status = AttemptStatus::from_acquired(guard.is_some());
        if let Some(guard) = guard {
            ctx.delay
                .pause(Pause::CriticalSection, ctx.critical_section)
                .await;
            if let Some(amount) = amount {
                ctx.ledger.credit(row, amount);
            }
            drop(guard);
        }
        let latency_ms = start.elapsed().as_millis() as u64;
        let rollback = status.rollback();

        self.last_collision
            .store(status.is_collision(), Ordering::Release);

        let avg_rollback = ctx.aggregator.average_rollback();
        let reward = self.policy.reward(latency_ms, rollback, avg_rollback);
        self.credit(reward);
        ctx.aggregator.report_rollback(rollback)?;

        ctx.metrics.record_attempt(status, latency_ms);
        debug!(
            worker = %self.name,
            row,
            ?status,
            latency_ms,
            avg_rollback,
            reward,
            "Attempt complete"
        );

        Ok(AttemptOutcome {
            worker: self.name.clone(),
            row,
            status,
            latency_ms,
            reward,
        })
    }

    async fn handle(&self, ctx: &WorkerContext, request: LockRequest) {
        let LockRequest { row, amount, reply } = request;
        match self.attempt(ctx, row, amount).await {
            Ok(outcome) => {
                if let Some(reply) = reply {
                    // Caller may have given up waiting
                    let _ = reply.send(outcome);
                }
            }
            Err(err) => warn!(worker = %self.name, row, error = %err, "Dropping request"),
        }
    }

    /// Worker loop. Exits once the worker is terminated or the source closes.
    pub async fn run(self: Arc<Self>, ctx: WorkerContext) {
        info!(worker = %self.name, policy = ?self.policy, "Worker started");
        let mut handled = 0u64;

        while self.is_alive() {
            match ctx.source.next(ctx.idle_poll).await {
                Ok(Some(request)) => {
                    self.handle(&ctx, request).await;
                    handled += 1;
                }
                Ok(None) => continue,
                Err(LockError::SourceClosed) => break,
                Err(err) => {
                    warn!(worker = %self.name, error = %err, "Request source error");
                    break;
                }
            }
        }

        info!(
            worker = %self.name,
            handled,
            cumulative_reward = self.cumulative_reward(),
            "Worker stopped"
        );
    }
}
