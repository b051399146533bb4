//! Engine: one lock table, one request queue, one aggregator, one population

use std::sync::Arc;

use parking_lot::Mutex;
use rowlock_common::{AttemptOutcome, Result, RewardMetrics, WorkerSnapshot};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::controller::{EpochReport, PopulationController};
use crate::delay::{Delay, TokioDelay};
use crate::fitness::RewardAggregator;
use crate::ledger::Ledger;
use crate::source::{LockRequest, RequestSource};
use crate::table::ResourceLockTable;
use crate::telemetry::EngineMetrics;
use crate::worker::WorkerContext;

pub struct Engine {
    config: EngineConfig,
    controller: Arc<PopulationController>,
    controller_task: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Build an engine that sleeps on the tokio timer
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_delay(config, Arc::new(TokioDelay))
    }

    /// Build an engine with a custom delay (tests inject zero delays)
    pub fn with_delay(config: EngineConfig, delay: Arc<dyn Delay>) -> Result<Self> {
        config.validate()?;

        let ctx = WorkerContext {
            table: Arc::new(ResourceLockTable::new(config.rows)),
            source: RequestSource::bounded(config.queue_capacity),
            aggregator: Arc::new(RewardAggregator::new()),
            ledger: Arc::new(Ledger::new()),
            delay,
            metrics: Arc::new(EngineMetrics::new()?),
            critical_section: config.critical_section(),
            idle_poll: config.idle_poll(),
        };
        let controller = Arc::new(PopulationController::new(ctx, config.epoch_interval()));

        Ok(Self {
            config,
            controller,
            controller_task: Mutex::new(None),
        })
    }

    /// Bootstrap the population and start the controller loop.
    /// Must be called inside a tokio runtime. Later calls are ignored.
    pub fn start(&self) {
        let mut slot = self.controller_task.lock();
        if slot.is_some() {
            warn!("Engine already started");
            return;
        }
        self.controller
            .bootstrap(self.config.workers, self.config.policy);
        *slot = Some(self.controller.spawn_loop());
        info!(
            rows = self.config.rows,
            workers = self.config.workers,
            epoch_interval_ms = self.config.epoch_interval_ms,
            "Engine started"
        );
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn controller(&self) -> &Arc<PopulationController> {
        &self.controller
    }

    pub fn context(&self) -> &WorkerContext {
        self.controller.context()
    }

    pub fn source(&self) -> &RequestSource {
        &self.context().source
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.context().metrics
    }

    /// Enqueue a lock request; the receiver resolves once a worker attempted it
    pub fn submit(&self, row: usize, amount: Option<i64>) -> Result<oneshot::Receiver<AttemptOutcome>> {
        self.context().table.check_row(row)?;
        let mut request = LockRequest::new(row);
        request.amount = amount;
        let (request, reply) = request.with_reply();
        self.source().submit(request)?;
        Ok(reply)
    }

    /// Simulated balance of a row (pure read, no locking)
    pub fn balance(&self, row: usize) -> Result<i64> {
        self.context().table.check_row(row)?;
        Ok(self.context().ledger.balance(row))
    }

    /// Run one evaluation now, outside the periodic loop
    pub fn evaluate(&self) -> Result<EpochReport> {
        self.controller.evaluate()
    }

    pub fn reward_metrics(&self) -> RewardMetrics {
        RewardMetrics {
            cumulative_reward: self.controller.total_reward(),
            population: self.controller.population(),
            avg_rollback: self.context().aggregator.average_rollback(),
            epoch: self.controller.epoch(),
        }
    }

    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        self.controller.workers()
    }

    /// Stop the controller and wait for every worker to finish
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
        let task = self.controller_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        info!("Engine stopped");
    }
}
