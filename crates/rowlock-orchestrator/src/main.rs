//! Rowlock fleet orchestrator
//!
//! ```text
//! ROWLOCK_INSTANCES=http://10.0.0.4:5000,http://10.0.0.5:5000 rowlock-orchestrator
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use rowlock_orchestrator::{LoggingScaleTarget, Orchestrator, OrchestratorConfig};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = OrchestratorConfig::load().context("loading orchestrator config")?;
    if config.instances.is_empty() {
        anyhow::bail!("ROWLOCK_INSTANCES is empty");
    }
    info!(instances = ?config.instances, "Starting orchestrator");

    let target = Arc::new(LoggingScaleTarget::new(config.target.clone()));
    let orchestrator = Orchestrator::new(config, target)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
        let _ = stop_tx.send(true);
    });

    orchestrator.run(stop_rx).await;
    Ok(())
}
