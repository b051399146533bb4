//! Orchestrator configuration

use std::time::Duration;

use rowlock_common::{parse_var, ConfigError};
use serde::{Deserialize, Serialize};

/// Fleet orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Base URLs of service instances, e.g. `http://10.0.0.4:5000`
    pub instances: Vec<String>,
    /// Seconds between scaling rounds
    pub interval_secs: u64,
    /// Per-instance metrics request timeout
    pub poll_timeout_ms: u64,
    /// Name of the scaled deployment, used in logs
    pub target: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            interval_secs: 30,
            poll_timeout_ms: 1000,
            target: "rowlock-service".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(list) = lookup("ROWLOCK_INSTANCES") {
            cfg.instances = list
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_ORCHESTRATOR_INTERVAL_SECS")? {
            cfg.interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_POLL_TIMEOUT_MS")? {
            cfg.poll_timeout_ms = v;
        }
        if let Some(target) = lookup("ROWLOCK_SCALE_TARGET") {
            cfg.target = target;
        }

        if cfg.interval_secs == 0 {
            return Err(ConfigError::TooSmall {
                field: "interval_secs",
                minimum: 1,
                actual: 0,
            });
        }
        Ok(cfg)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}
