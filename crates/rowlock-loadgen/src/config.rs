//! Load generator configuration

use std::time::Duration;

use rowlock_common::{parse_var, ConfigError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadgenConfig {
    /// Service base URL
    pub service_url: String,
    /// Number of rows addressed
    pub accounts: usize,
    /// Leading fraction of rows that form the hotspot
    pub hotspot_fraction: f64,
    /// Fraction of traffic sent to the hotspot
    pub hotspot_load: f64,
    /// Requests per second
    pub rate: u64,
    pub duration_secs: u64,
    /// Fraction of requests that are lock POSTs; the rest are balance reads
    pub write_ratio: f64,
    /// Maximum requests in flight
    pub concurrency: usize,
    /// Batch cadence
    pub batch_ms: u64,
    /// Fixed seed for a reproducible request sequence
    pub seed: Option<u64>,
}

impl Default for LoadgenConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:5000".to_string(),
            accounts: 100,
            hotspot_fraction: 0.2,
            hotspot_load: 0.8,
            rate: 500,
            duration_secs: 60,
            write_ratio: 0.3,
            concurrency: 100,
            batch_ms: 100,
            seed: None,
        }
    }
}

fn fraction(field: &'static str, actual: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&actual) {
        return Err(ConfigError::OutOfRange { field, actual });
    }
    Ok(())
}

impl LoadgenConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(url) = lookup("ROWLOCK_SERVICE_URL") {
            cfg.service_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_ACCOUNTS")? {
            cfg.accounts = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_HOTSPOT_FRACTION")? {
            cfg.hotspot_fraction = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_HOTSPOT_LOAD")? {
            cfg.hotspot_load = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_RATE")? {
            cfg.rate = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_DURATION_SECS")? {
            cfg.duration_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_WRITE_RATIO")? {
            cfg.write_ratio = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_CONCURRENCY")? {
            cfg.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "ROWLOCK_LOADGEN_SEED")? {
            cfg.seed = Some(v);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts == 0 {
            return Err(ConfigError::TooSmall {
                field: "accounts",
                minimum: 1,
                actual: 0,
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::TooSmall {
                field: "concurrency",
                minimum: 1,
                actual: 0,
            });
        }
        if self.batch_ms == 0 {
            return Err(ConfigError::TooSmall {
                field: "batch_ms",
                minimum: 1,
                actual: 0,
            });
        }
        if self.batch_size() == 0 {
            // At least one request per batch
            return Err(ConfigError::TooSmall {
                field: "rate",
                minimum: (1000 + self.batch_ms - 1) / self.batch_ms,
                actual: self.rate,
            });
        }
        fraction("hotspot_fraction", self.hotspot_fraction)?;
        fraction("hotspot_load", self.hotspot_load)?;
        fraction("write_ratio", self.write_ratio)?;
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_ms)
    }

    /// Requests issued per batch
    pub fn batch_size(&self) -> u64 {
        self.rate * self.batch_ms / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_hotspot_profile() {
        let cfg = LoadgenConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.accounts, 100);
        assert_eq!(cfg.batch_size(), 50);
        assert_eq!(cfg.duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_rate_too_low_for_batch() {
        let err = LoadgenConfig::from_lookup(|key| {
            (key == "ROWLOCK_LOADGEN_RATE").then(|| "5".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::TooSmall {
                field: "rate",
                minimum: 10,
                actual: 5
            }
        );

        let cfg = LoadgenConfig::from_lookup(|key| {
            (key == "ROWLOCK_LOADGEN_RATE").then(|| "10".to_string())
        })
        .unwrap();
        assert_eq!(cfg.batch_size(), 1);
    }

    #[test]
    fn test_fraction_bounds() {
        let err = LoadgenConfig::from_lookup(|key| {
            (key == "ROWLOCK_LOADGEN_WRITE_RATIO").then(|| "1.5".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::OutOfRange {
                field: "write_ratio",
                actual: 1.5
            }
        );
    }
}
