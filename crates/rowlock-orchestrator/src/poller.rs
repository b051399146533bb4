//! Reward metrics collection from service instances

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use rowlock_common::{Result, RewardMetrics, RowlockError};
use tracing::{debug, warn};

/// One instance that answered
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceReward {
    pub instance: String,
    pub metrics: RewardMetrics,
}

pub struct MetricsPoller {
    client: Client,
}

impl MetricsPoller {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RowlockError::Network(format!("building http client: {e}")))?;
        Ok(Self { client })
    }

    /// `GET {base}/metrics`
    pub async fn fetch(&self, base: &str) -> Result<RewardMetrics> {
        let url = format!("{base}/metrics");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RowlockError::Network(format!("{url}: {e}")))?;
        response
            .json::<RewardMetrics>()
            .await
            .map_err(|e| RowlockError::Serialization(format!("{url}: {e}")))
    }

    /// Poll every instance concurrently; failures are logged and skipped
    pub async fn poll_all(&self, instances: &[String]) -> Vec<InstanceReward> {
        let results = join_all(instances.iter().map(|base| async move {
            (base, self.fetch(base).await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(instance, result)| match result {
                Ok(metrics) => {
                    debug!(%instance, reward = metrics.cumulative_reward, "Polled instance");
                    Some(InstanceReward {
                        instance: instance.clone(),
                        metrics,
                    })
                }
                Err(err) => {
                    warn!(%instance, error = %err, "Skipping unreachable instance");
                    None
                }
            })
            .collect()
    }
}
