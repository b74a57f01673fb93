//! Binance trade journal - command line entry point.
//!
//! Discovers every symbol with trade history on the configured account and
//! prints a per-symbol summary.
//!
//! Environment:
//! - `BINANCE_API_KEY` / `BINANCE_API_SECRET` - required
//! - `BINANCE_SYMBOLS` - comma-separated symbols to check first
//! - `BINANCE_MARKET` - `spot` (default), `futures` or `both`

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use trade_journal::config::{ClientConfig, DiscoveryConfig};
use trade_journal::connectors::{relay_channel, ApiCredentials, BinanceApiClient, DirectRelay};
use trade_journal::discovery::{CancelHandle, TradeDiscoveryEngine};
use trade_journal::events::{progress_channel, MarketType};
use trade_journal::utils::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file found or error loading it: {}", e);
    }

    init_telemetry();

    let credentials = ApiCredentials::from_env()
        .context("Set BINANCE_API_KEY and BINANCE_API_SECRET to run discovery")?;
    credentials.validate()?;

    let hints: Vec<String> = std::env::var("BINANCE_SYMBOLS")
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let market: MarketType = match std::env::var("BINANCE_MARKET") {
        Ok(value) => value.parse()?,
        Err(_) => MarketType::default(),
    };

    let client_config = ClientConfig::from_env();
    info!("Spot API: {}", client_config.spot_base_url);
    info!("Futures API: {}", client_config.futures_base_url);

    // Every exchange call is handed to a dedicated relay task.
    let (relay, worker) = relay_channel(DirectRelay::new(client_config.request_timeout)?, 16);
    let relay_task = tokio::spawn(worker.run());

    let client = BinanceApiClient::new(Arc::new(relay), client_config);
    let engine = TradeDiscoveryEngine::new(client, DiscoveryConfig::from_env());

    let cancel = CancelHandle::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current request");
            ctrl_c_cancel.cancel();
        }
    });

    let (sink, mut stream) = progress_channel();
    let progress_task = tokio::spawn(async move {
        while let Some(event) = stream.recv().await {
            info!("{}", event.message());
        }
    });

    let outcome = engine
        .discover(&credentials, &hints, market, sink, &cancel)
        .await;

    // The sink was consumed by discover, so the stream is closed.
    if let Err(e) = progress_task.await {
        error!("Progress reporter failed: {:?}", e);
    }

    let result = outcome?;

    info!("═══════════════ Summary ═══════════════");
    for (symbol, count) in result.trade_counts() {
        info!("{:<12} {:>6} trades", symbol, count);
    }
    info!(
        "Total: {} trades from {} symbols",
        result.trades.len(),
        result.symbols.len()
    );

    drop(engine);
    if let Err(e) = relay_task.await {
        error!("Relay worker failed: {:?}", e);
    }

    Ok(())
}
