//! Ratewise Engine - runs the snapshot recorder against in-memory backends

use std::sync::Arc;

use ratewise_engine::{
    EngineConfig, EngineMetrics, InMemoryPositionStore, PositionStore, RateEngine,
    SnapshotRecorder,
};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_WALLET: &str = "0x742d35cc6634c0532925a3b844bc454e4438f44e";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ratewise Engine...");

    let config = EngineConfig::load()?;
    tracing::info!(
        base_rate = config.rates.base_rate,
        min_rate = config.rates.min_rate,
        max_rate = config.rates.max_rate,
        assets = ?config.assets,
        "Loaded configuration"
    );

    let registry = prometheus::Registry::new();
    let metrics = Arc::new(EngineMetrics::new()?);
    metrics.register(&registry)?;

    let positions = Arc::new(InMemoryPositionStore::new());
    positions
        .put_position(InMemoryPositionStore::reference_position(DEMO_WALLET))
        .await?;

    let engine = Arc::new(
        RateEngine::builder(config.clone())
            .position_store(positions)
            .metrics(metrics)
            .build()?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let recorder = SnapshotRecorder::new(Arc::clone(&engine), &config);
    let recorder_task = tokio::spawn(recorder.run(shutdown_rx));

    let health = engine.calculate_health(DEMO_WALLET).await;
    let report = serde_json::to_string(&health)?;
    tracing::info!(
        wallet = DEMO_WALLET,
        report = %report,
        "Reference wallet health"
    );

    tracing::info!("Ratewise Engine started successfully");

    // Keep running
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    shutdown_tx.send(true)?;
    recorder_task.await?;

    Ok(())
}
