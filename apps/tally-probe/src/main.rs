//! # Tally Probe
//!
//! Connects to the configured redis deployment and counts a run of hits
//! against one key, printing each result as a JSON line.

use std::sync::Arc;

use tally_core::ports::HitCounter;
use tally_infra::{RedisCounterStore, WindowCounter};

mod config;
mod telemetry;

use config::ProbeConfig;
use telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = ProbeConfig::from_env();

    tracing::info!(
        mode = config.store.topology.mode(),
        key = %config.key,
        hits = config.hits,
        weight = config.weight,
        interval_ms = config.window.interval_millis,
        "Starting probe"
    );

    let store = RedisCounterStore::new(config.store.clone()).await?;
    let counter = WindowCounter::new(Arc::new(store));

    for _ in 0..config.hits {
        let hit = counter
            .increment(&config.key, &config.window, config.weight)
            .await?;
        println!("{}", serde_json::to_string(&hit)?);
    }

    if config.refund_last && config.hits > 0 {
        counter.decrement(&config.key, config.weight).await?;
        tracing::info!(key = %config.key, weight = config.weight, "Refunded last hit");
    }

    Ok(())
}
