//! Service configuration

use std::time::Duration;

use rowlock_common::{parse_var, ConfigError};
use rowlock_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// How long a lock request may wait for a worker
    pub request_timeout_ms: u64,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Engine behind the service
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout_ms: 5000,
            log_json: false,
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from `.env` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self {
            engine: EngineConfig::from_lookup(&lookup)?,
            ..Self::default()
        };

        // Platform PORT first, ROWLOCK_PORT wins if both are set
        if let Some(port) = parse_var(&lookup, "PORT")? {
            cfg.port = port;
        }
        if let Some(host) = lookup("ROWLOCK_HOST") {
            cfg.host = host;
        }
        if let Some(port) = parse_var(&lookup, "ROWLOCK_PORT")? {
            cfg.port = port;
        }
        if let Some(ms) = parse_var(&lookup, "ROWLOCK_REQUEST_TIMEOUT_MS")? {
            cfg.request_timeout_ms = ms;
        }
        if let Some(json) = parse_var(&lookup, "ROWLOCK_LOG_JSON")? {
            cfg.log_json = json;
        }

        if cfg.request_timeout_ms == 0 {
            return Err(ConfigError::TooSmall {
                field: "request_timeout_ms",
                minimum: 1,
                actual: 0,
            });
        }
        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
