//! # Rowlock Loadgen
//!
//! Hotspot workload against a running service: `rate` requests per second
//! issued in fixed batches, a `write_ratio` share of them lock POSTs and the
//! rest balance reads, with at most `concurrency` in flight.

pub mod config;
pub mod summary;
pub mod workload;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::Client;
use rowlock_common::{BalanceReply, LockReply, Result, RowlockError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub use config::LoadgenConfig;
pub use summary::{percentile, Sample, Summary};
pub use workload::{Op, Workload};

pub struct Loadgen {
    config: LoadgenConfig,
    client: Client,
    workload: Workload,
}

async fn issue(client: &Client, base: &str, op: Op) -> Result<Sample> {
    let network = |e: reqwest::Error| RowlockError::Network(e.to_string());
    match op {
        Op::Lock(row) => {
            let reply: LockReply = client
                .post(format!("{base}/accounts/{row}/lock"))
                .json(&serde_json::json!({ "amount": 1 }))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(network)?
                .json()
                .await
                .map_err(network)?;
            Ok(Sample::Lock {
                status: reply.result,
                latency_ms: reply.latency_ms,
            })
        }
        Op::Balance(row) => {
            let reply: BalanceReply = client
                .get(format!("{base}/accounts/{row}/balance"))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(network)?
                .json()
                .await
                .map_err(network)?;
            Ok(Sample::Balance {
                latency_ms: reply.latency_ms,
            })
        }
    }
}

impl Loadgen {
    pub fn new(config: LoadgenConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .pool_max_idle_per_host(config.concurrency)
            .build()
            .map_err(|e| RowlockError::Network(format!("building http client: {e}")))?;
        let workload = Workload::new(&config);
        Ok(Self {
            config,
            client,
            workload,
        })
    }

    pub fn config(&self) -> &LoadgenConfig {
        &self.config
    }

    /// Issue batches until `duration` elapses, then wait for every in-flight
    /// request and summarise.
    pub async fn run(&self) -> Summary {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let base: Arc<str> = Arc::from(self.config.service_url.as_str());
        let mut inflight = JoinSet::new();

        let mut ticker = tokio::time::interval(self.config.batch_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let start = Instant::now();
        let end = start + self.config.duration();
        let mut issued = 0u64;

        info!(
            url = %self.config.service_url,
            rate = self.config.rate,
            duration_secs = self.config.duration_secs,
            hot_rows = self.workload.hot_rows(),
            "Load generation started"
        );

        loop {
            ticker.tick().await;
            if Instant::now() >= end {
                break;
            }
            for _ in 0..self.config.batch_size() {
                let op = self.workload.next_op(&mut rng);
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let client = self.client.clone();
                let base = Arc::clone(&base);
                inflight.spawn(async move {
                    let sample = issue(&client, &base, op).await;
                    drop(permit);
                    sample
                });
                issued += 1;
            }
            debug!(issued, inflight = inflight.len(), "Batch issued");
        }

        let mut samples = Vec::with_capacity(issued as usize);
        while let Some(joined) = inflight.join_next().await {
            match joined {
                Ok(Ok(sample)) => samples.push(sample),
                Ok(Err(err)) => {
                    debug!(error = %err, "Request failed");
                    samples.push(Sample::Failed);
                }
                Err(err) => {
                    warn!(error = %err, "Request task panicked");
                    samples.push(Sample::Failed);
                }
            }
        }

        let summary = Summary::from_samples(&samples, start.elapsed());
        info!(
            total = summary.total,
            failures = summary.failures,
            collision_pct = summary.collision_pct,
            "Load generation finished"
        );
        summary
    }
}
