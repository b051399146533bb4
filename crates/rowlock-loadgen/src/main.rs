//! Rowlock hotspot load generator
//!
//! ```text
//! ROWLOCK_SERVICE_URL=http://localhost:5000 ROWLOCK_LOADGEN_RATE=500 rowlock-loadgen
//! ```

use anyhow::{Context, Result};
use rowlock_loadgen::{LoadgenConfig, Loadgen};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LoadgenConfig::load().context("loading loadgen config")?;
    let summary = Loadgen::new(config)?.run().await;
    println!("{summary}");
    Ok(())
}
