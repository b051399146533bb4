//! Prometheus metrics for the contention engine

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder,
};
use rowlock_common::{AttemptStatus, Result, RowlockError};

fn internal(err: prometheus::Error) -> RowlockError {
    RowlockError::Internal(format!("metrics: {err}"))
}

/// Engine-wide collectors, registered on their own registry
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    pub attempts_total: IntCounter,
    pub collisions_total: IntCounter,
    pub attempt_latency_ms: Histogram,
    pub population: IntGauge,
    pub epochs_total: IntCounter,
    pub terminated_total: IntCounter,
    pub cloned_total: IntCounter,
    pub live_reward: Gauge,
}

impl EngineMetrics {
    pub fn new() -> Result<Self> {
        let metrics = Self {
            registry: Registry::new(),
            attempts_total: IntCounter::new(
                "rowlock_attempts_total",
                "Lock attempts made by all workers",
            )
            .map_err(internal)?,
            collisions_total: IntCounter::new(
                "rowlock_collisions_total",
                "Lock attempts that found the row already held",
            )
            .map_err(internal)?,
            attempt_latency_ms: Histogram::with_opts(
                HistogramOpts::new(
                    "rowlock_attempt_latency_ms",
                    "Attempt latency in whole milliseconds",
                )
                .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
            )
            .map_err(internal)?,
            population: IntGauge::new("rowlock_population", "Live workers").map_err(internal)?,
            epochs_total: IntCounter::new(
                "rowlock_epochs_total",
                "Completed controller evaluations",
            )
            .map_err(internal)?,
            terminated_total: IntCounter::new(
                "rowlock_workers_terminated_total",
                "Workers removed as bottom performers",
            )
            .map_err(internal)?,
            cloned_total: IntCounter::new(
                "rowlock_workers_cloned_total",
                "Workers created by cloning top performers",
            )
            .map_err(internal)?,
            live_reward: Gauge::new(
                "rowlock_live_reward",
                "Cumulative reward summed over live workers at the last evaluation",
            )
            .map_err(internal)?,
        };
        metrics.register()?;
        Ok(metrics)
    }

    fn register(&self) -> Result<()> {
        let r = &self.registry;
        r.register(Box::new(self.attempts_total.clone())).map_err(internal)?;
        r.register(Box::new(self.collisions_total.clone())).map_err(internal)?;
        r.register(Box::new(self.attempt_latency_ms.clone())).map_err(internal)?;
        r.register(Box::new(self.population.clone())).map_err(internal)?;
        r.register(Box::new(self.epochs_total.clone())).map_err(internal)?;
        r.register(Box::new(self.terminated_total.clone())).map_err(internal)?;
        r.register(Box::new(self.cloned_total.clone())).map_err(internal)?;
        r.register(Box::new(self.live_reward.clone())).map_err(internal)?;
        Ok(())
    }

    pub fn record_attempt(&self, status: AttemptStatus, latency_ms: u64) {
        self.attempts_total.inc();
        if status.is_collision() {
            self.collisions_total.inc();
        }
        self.attempt_latency_ms.observe(latency_ms as f64);
    }

    /// Text exposition format
    pub fn encode(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(internal)?;
        String::from_utf8(buf).map_err(|e| RowlockError::Internal(e.to_string()))
    }
}
