//! Rowlock HTTP service
//!
//! ```text
//! ROWLOCK_ROWS=100 ROWLOCK_WORKERS=3 PORT=5000 rowlock-service
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use rowlock_engine::Engine;
use rowlock_service::{router, AppState, ServiceConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?
        .add_directive("rowlock_service=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for ctrl-c");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load().context("loading service config")?;
    init_tracing(config.log_json)?;

    let engine = Arc::new(Engine::new(config.engine.clone())?);
    engine.start();

    let app = router(AppState::new(Arc::clone(&engine), config.request_timeout()));

    let addr = config.addr();
    info!(
        %addr,
        rows = config.engine.rows,
        workers = config.engine.workers,
        "Rowlock service starting"
    );
    info!("Endpoints: /health, /accounts/:row/lock, /accounts/:row/balance, /metrics, /workers");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.shutdown().await;
    info!("Rowlock service stopped");
    Ok(())
}
