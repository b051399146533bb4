//! # Rowlock Orchestrator
//!
//! Fleet-level scaling across service instances. Each round polls every
//! instance's `/metrics`, averages the reported cumulative rewards and asks
//! the [`ScaleTarget`] for `max(1, instances strictly above the mean)`
//! replicas.

pub mod config;
pub mod poller;
pub mod target;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rowlock_common::Result;
use rowlock_engine::fleet_target;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

pub use config::OrchestratorConfig;
pub use poller::{InstanceReward, MetricsPoller};
pub use target::{LoggingScaleTarget, ScaleTarget};

pub struct Orchestrator {
    config: OrchestratorConfig,
    poller: MetricsPoller,
    target: Arc<dyn ScaleTarget>,
    rounds: AtomicU64,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, target: Arc<dyn ScaleTarget>) -> Result<Self> {
        let poller = MetricsPoller::new(config.poll_timeout())?;
        Ok(Self {
            config,
            poller,
            target,
            rounds: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Rounds started so far
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    /// One polling round. Returns the desired count, or `None` when no
    /// instance answered and the round was skipped.
    #[instrument(skip(self), fields(instances = self.config.instances.len()))]
    pub async fn round(&self) -> Result<Option<usize>> {
        self.rounds.fetch_add(1, Ordering::Relaxed);
        let polled = self.poller.poll_all(&self.config.instances).await;
        let rewards: Vec<f64> = polled.iter().map(|p| p.metrics.cumulative_reward).collect();

        let Some(desired) = fleet_target(&rewards) else {
            warn!("No instance answered, skipping round");
            return Ok(None);
        };

        info!(
            answered = rewards.len(),
            mean_reward = rewards.iter().sum::<f64>() / rewards.len() as f64,
            desired,
            "Fleet evaluated"
        );
        self.target.set_desired(desired).await?;
        Ok(Some(desired))
    }

    /// Run rounds every `interval` until `stop` flips to true. The first
    /// round happens one full interval after start, once instances have
    /// accrued reward.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        info!(
            interval_secs = self.config.interval_secs,
            scale_target = %self.config.target,
            "Orchestrator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.changed() => break,
            }
            if *stop.borrow() {
                break;
            }
            if let Err(err) = self.round().await {
                error!(error = %err, "Scaling round failed");
            }
        }
        info!(rounds = self.rounds(), "Orchestrator stopped");
    }
}
