//! Standalone simulation: synthetic traffic against an in-process population
//!
//! ```text
//! ROWLOCK_WORKERS=3 ROWLOCK_ROWS=1 ROWLOCK_EPOCH_INTERVAL_MS=10000 \
//! ROWLOCK_SIM_RATE=50 ROWLOCK_SIM_DURATION_SECS=60 rowlock-simulate
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use rowlock_engine::{Engine, EngineConfig, SyntheticTraffic};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid value for {key}: {v}")),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::load().context("loading engine config")?;
    let rate: f64 = env_or("ROWLOCK_SIM_RATE", 50.0)?;
    let duration = Duration::from_secs(env_or("ROWLOCK_SIM_DURATION_SECS", 60u64)?);
    info!(?config, rate, duration_secs = duration.as_secs(), "Starting simulation");

    let traffic = SyntheticTraffic::new(rate, config.rows).context("ROWLOCK_SIM_RATE")?;

    let engine = Engine::new(config)?;
    engine.start();
    let traffic = traffic.spawn(engine.source().clone());

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    let metrics = engine.reward_metrics();
    engine.shutdown().await;
    let _ = traffic.await;

    println!("Simulation complete. Final service count: {}", metrics.population);
    println!(
        "Epochs: {}  cumulative reward: {:.1}  attempts: {}  collisions: {}",
        metrics.epoch,
        metrics.cumulative_reward,
        engine.metrics().attempts_total.get(),
        engine.metrics().collisions_total.get(),
    );
    Ok(())
}
