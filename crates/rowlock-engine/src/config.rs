//! Engine configuration

use std::time::Duration;

use rowlock_common::{
    parse_var, ConfigError, WorkerPolicy, DEFAULT_CRITICAL_SECTION_MS, DEFAULT_EPOCH_SECS,
    DEFAULT_IDLE_POLL_MS,
};
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Size of the lock table
    pub rows: usize,
    /// Initial population
    pub workers: usize,
    /// Policy given to every bootstrapped worker
    pub policy: WorkerPolicy,
    /// Controller epoch length
    pub epoch_interval_ms: u64,
    /// Simulated transaction work while a row is held
    pub critical_section_ms: u64,
    /// Bounded wait for the next request before rechecking liveness
    pub idle_poll_ms: u64,
    /// Maximum queued requests
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rows: 1,
            workers: 3,
            policy: WorkerPolicy::default(),
            epoch_interval_ms: DEFAULT_EPOCH_SECS * 1000,
            critical_section_ms: DEFAULT_CRITICAL_SECTION_MS,
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
            queue_capacity: 10_000,
        }
    }
}

fn at_least(field: &'static str, minimum: u64, actual: u64) -> Result<(), ConfigError> {
    if actual < minimum {
        return Err(ConfigError::TooSmall {
            field,
            minimum,
            actual,
        });
    }
    Ok(())
}

fn weight(field: &'static str, actual: f64) -> Result<(), ConfigError> {
    if !actual.is_finite() || actual < 0.0 {
        return Err(ConfigError::InvalidWeight { field, actual });
    }
    Ok(())
}

impl EngineConfig {
    /// Load from `.env` and `ROWLOCK_*` environment variables over the defaults
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay variables returned by `lookup` on the defaults, then validate
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = parse_var(&lookup, "ROWLOCK_ROWS")? {
            cfg.rows = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_WORKERS")? {
            cfg.workers = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_BETA")? {
            cfg.policy.beta = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_GAMMA")? {
            cfg.policy.gamma = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_DELTA_MS")? {
            cfg.policy.delta_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_EPOCH_INTERVAL_MS")? {
            cfg.epoch_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_CRITICAL_SECTION_MS")? {
            cfg.critical_section_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_IDLE_POLL_MS")? {
            cfg.idle_poll_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_QUEUE_CAPACITY")? {
            cfg.queue_capacity = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("rows", 1, self.rows as u64)?;
        at_least("workers", 1, self.workers as u64)?;
        at_least("epoch_interval_ms", 1, self.epoch_interval_ms)?;
        at_least("idle_poll_ms", 1, self.idle_poll_ms)?;
        at_least("queue_capacity", 1, self.queue_capacity as u64)?;
        weight("beta", self.policy.beta)?;
        weight("gamma", self.policy.gamma)?;
        Ok(())
    }

    pub fn epoch_interval(&self) -> Duration {
        Duration::from_millis(self.epoch_interval_ms)
    }

    pub fn critical_section(&self) -> Duration {
        Duration::from_millis(self.critical_section_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}
