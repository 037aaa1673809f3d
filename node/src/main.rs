//! SwapDesk Node Binary
//!
//! Runs the exchange with an in-memory store and CoinGecko prices.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swapdesk_fx::CoinGeckoPriceSource;
use swapdesk_node::{Exchange, NodeConfig};
use swapdesk_store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting SwapDesk node");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let source = CoinGeckoPriceSource::new(config.rates.coingecko_url.clone(), config.rates.fetch_timeout)?;
    let exchange = Arc::new(Exchange::new(
        config.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(source),
    ));

    exchange.start().await?;

    info!(
        coingecko_url = %config.rates.coingecko_url,
        refresh_interval_secs = config.rates.refresh_interval.as_secs(),
        sweep_interval_secs = config.orders.sweep_interval.as_secs(),
        "SwapDesk node running"
    );

    // Keep running until shutdown
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    exchange.stop().await;

    info!("SwapDesk node shutdown complete");
    Ok(())
}
