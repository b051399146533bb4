//! Population controller: periodic reward-ranked selection
//!
//! Only the controller adds or removes workers. Each evaluation builds the
//! next worker set off to the side and publishes it in one swap, so readers
//! holding the previous snapshot are never disturbed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};
use rowlock_common::{Result, RowlockError, WorkerPolicy, WorkerSnapshot, MIN_POPULATION};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::culling::SelectionPlan;
use crate::worker::{Worker, WorkerContext};

/// What one evaluation did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochReport {
    /// 1-based epoch number
    pub epoch: u64,
    pub population_before: usize,
    pub population_after: usize,
    /// Names of culled workers, lowest reward last
    pub terminated: Vec<String>,
    /// (parent, clone) name pairs
    pub cloned: Vec<(String, String)>,
    /// Mean rollback rate of the epoch just closed
    pub avg_rollback: f64,
    pub evaluated_at: DateTime<Utc>,
}

pub struct PopulationController {
    ctx: WorkerContext,
    interval: Duration,
    workers: RwLock<Arc<Vec<Arc<Worker>>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_seq: AtomicU64,
    epoch: AtomicU64,
    stop_tx: watch::Sender<bool>,
}

impl PopulationController {
    pub fn new(ctx: WorkerContext, interval: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            ctx,
            interval,
            workers: RwLock::new(Arc::new(Vec::new())),
            tasks: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(1),
            epoch: AtomicU64::new(0),
            stop_tx,
        }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Start a worker task. Must be called inside a tokio runtime.
    fn start(&self, worker: Worker) -> Arc<Worker> {
        let worker = Arc::new(worker);
        let task = tokio::spawn(Arc::clone(&worker).run(self.ctx.clone()));
        self.tasks.lock().push(task);
        worker
    }

    /// Create and start `count` workers named `svc<i>-<seq>`
    pub fn bootstrap(&self, count: usize, policy: WorkerPolicy) -> Vec<Arc<Worker>> {
        let mut guard = self.workers.write();
        let mut next: Vec<Arc<Worker>> = (**guard).clone();
        let started: Vec<Arc<Worker>> = (0..count)
            .map(|i| self.start(Worker::new(format!("svc{i}"), self.next_seq(), policy)))
            .collect();
        next.extend(started.iter().cloned());
        *guard = Arc::new(next);

        self.ctx.metrics.population.set(guard.len() as i64);
        info!(count, population = guard.len(), "Population bootstrapped");
        started
    }

    /// Current live set (copy-on-write snapshot)
    pub fn live(&self) -> Arc<Vec<Arc<Worker>>> {
        Arc::clone(&*self.workers.read())
    }

    pub fn population(&self) -> usize {
        self.workers.read().len()
    }

    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        self.live().iter().map(|w| w.snapshot()).collect()
    }

    /// Sum of cumulative reward over live workers
    pub fn total_reward(&self) -> f64 {
        self.live().iter().map(|w| w.cumulative_reward()).sum()
    }

    /// Completed evaluations
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Relaxed)
    }

    /// One evaluation: rank, cull bottom k, clone top k, reset the epoch.
    ///
    /// Must be called inside a tokio runtime (clones are spawned).
    #[instrument(skip(self))]
    pub fn evaluate(&self) -> Result<EpochReport> {
        let guard = self.workers.upgradable_read();
        let current = Arc::clone(&*guard);

        let rewards: Vec<f64> = current.iter().map(|w| w.cumulative_reward()).collect();
        let plan = SelectionPlan::from_rewards(&rewards).ok_or_else(|| {
            RowlockError::Invariant("evaluated an empty population".to_string())
        })?;

        if plan.population_after() < MIN_POPULATION {
            return Err(RowlockError::Invariant(format!(
                "selection would leave {} workers",
                plan.population_after()
            )));
        }
        debug!(population = current.len(), k = plan.k(), "Applying selection");

        let mut culled = vec![false; current.len()];
        let mut terminated = Vec::with_capacity(plan.terminate.len());
        for &idx in &plan.terminate {
            let worker = &current[idx];
            worker.terminate();
            culled[idx] = true;
            terminated.push(worker.name().to_string());
            debug!(worker = %worker.name(), reward = rewards[idx], "Culling worker");
        }

        let mut next: Vec<Arc<Worker>> = current
            .iter()
            .zip(&culled)
            .filter(|&(_, gone)| !*gone)
            .map(|(w, _)| Arc::clone(w))
            .collect();

        let mut cloned = Vec::with_capacity(plan.clone_from.len());
        for &idx in &plan.clone_from {
            let parent = &current[idx];
            let child = self.start(parent.clone_fresh(self.next_seq()));
            debug!(parent = %parent.name(), clone = %child.name(), reward = rewards[idx], "Cloning worker");
            cloned.push((parent.name().to_string(), child.name().to_string()));
            next.push(child);
        }

        let population_before = current.len();
        let population_after = next.len();
        *RwLockUpgradableReadGuard::upgrade(guard) = Arc::new(next);

        let closed = self.ctx.aggregator.reset_epoch();
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed) + 1;
        self.tasks.lock().retain(|t| !t.is_finished());

        let metrics = &self.ctx.metrics;
        metrics.epochs_total.inc();
        metrics.terminated_total.inc_by(terminated.len() as u64);
        metrics.cloned_total.inc_by(cloned.len() as u64);
        metrics.population.set(population_after as i64);
        metrics.live_reward.set(self.total_reward());

        info!(
            epoch,
            population_before,
            population_after,
            culled = terminated.len(),
            cloned = cloned.len(),
            avg_rollback = closed.average,
            samples = closed.samples,
            "Epoch evaluated"
        );

        Ok(EpochReport {
            epoch,
            population_before,
            population_after,
            terminated,
            cloned,
            avg_rollback: closed.average,
            evaluated_at: Utc::now(),
        })
    }

    /// Spawn the periodic evaluation loop. Stops on [`shutdown`](Self::shutdown)
    /// or when an evaluation reports a broken invariant.
    pub fn spawn_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut stop_rx = self.stop_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            info!(interval_ms = this.interval.as_millis() as u64, "Controller started");

            loop {
                if *stop_rx.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                if let Err(err) = this.evaluate() {
                    error!(error = %err, "Controller stopping");
                    break;
                }
            }
            info!(epochs = this.epoch(), "Controller stopped");
        })
    }

    /// Stop the loop, terminate every worker, close the source and wait for
    /// all worker tasks to finish their in-flight attempt.
    pub async fn shutdown(&self) {
        let _ = self.stop_tx.send(true);
        for worker in self.live().iter() {
            worker.terminate();
        }
        self.ctx.source.close().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Worker task failed");
            }
        }
        self.ctx.metrics.population.set(0);
        info!("Population shut down");
    }
}
