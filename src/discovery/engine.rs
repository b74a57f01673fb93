//! Trade discovery across an account.
//!
//! Binance has no "all my trades" endpoint; trade history is only available
//! per symbol. Discovery therefore runs in three sequential phases:
//!
//! 1. Symbols supplied by the user are checked first.
//! 2. Account balances are fetched and turned into candidate pairs.
//! 3. Every candidate not already found is checked on spot.
//!
//! Per-symbol failures are expected (most generated pairs do not exist) and
//! are skipped. A failed account lookup aborts the run.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::connectors::{ApiCredentials, ApiError, AuthError, BinanceApiClient, RequestPacer};
use crate::events::{DiscoveryEvent, MarketType, ProgressSink, Trade};

use super::candidates::generate_candidates;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(AuthError),

    #[error("Account lookup failed: {0}")]
    Account(ApiError),

    #[error("Request signing failed: {0}")]
    Signing(ApiError),

    #[error("Discovery cancelled")]
    Cancelled,
}

/// Outcome of checking one symbol on one market.
#[derive(Debug)]
pub enum SymbolFetch {
    Found(Vec<Trade>),
    Skip(SkipReason),
    Fatal(ApiError),
}

#[derive(Debug)]
pub enum SkipReason {
    NoTrades,
    Failed(ApiError),
}

impl SymbolFetch {
    /// Sorts a fetch result into found, skippable or fatal.
    ///
    /// Only failures to sign the request are fatal; every exchange or
    /// transport error means "no trades here".
    pub fn from_result(result: Result<Vec<Trade>, ApiError>) -> Self {
        match result {
            Ok(trades) if trades.is_empty() => SymbolFetch::Skip(SkipReason::NoTrades),
            Ok(trades) => SymbolFetch::Found(trades),
            Err(e @ ApiError::Auth(_)) => SymbolFetch::Fatal(e),
            Err(e) => SymbolFetch::Skip(SkipReason::Failed(e)),
        }
    }
}

/// Shared flag that stops a running discovery between requests.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Trades found by a discovery run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryResult {
    /// In the order they were found, not sorted by time.
    pub trades: Vec<Trade>,
    /// Symbols with at least one trade, sorted.
    pub symbols: Vec<String>,
}

impl DiscoveryResult {
    /// Number of trades per symbol.
    pub fn trade_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for trade in &self.trades {
            *counts.entry(trade.symbol.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Accumulates trades while a run progresses.
#[derive(Default)]
struct Discovered {
    trades: Vec<Trade>,
    symbols: BTreeSet<String>,
}

impl Discovered {
    fn record(
        &mut self,
        symbol: &str,
        market: MarketType,
        trades: Vec<Trade>,
        progress: &ProgressSink,
    ) {
        info!("✓ {}: {} trades ({})", symbol, trades.len(), market.label());
        progress.emit(DiscoveryEvent::SymbolFound {
            symbol: symbol.to_string(),
            market,
            count: trades.len(),
        });
        self.trades.extend(trades);
        self.symbols.insert(symbol.to_string());
    }

    fn finish(self, progress: &ProgressSink) -> DiscoveryResult {
        info!(
            "Discovery complete: {} trades from {} symbols",
            self.trades.len(),
            self.symbols.len()
        );
        progress.emit(DiscoveryEvent::Complete {
            trades: self.trades.len(),
            symbols: self.symbols.len(),
        });

        DiscoveryResult {
            trades: self.trades,
            symbols: self.symbols.into_iter().collect(),
        }
    }
}

/// Finds every symbol with trade history on an account.
///
/// All requests are issued one at a time. Callers must not run two
/// discoveries concurrently against the same account.
pub struct TradeDiscoveryEngine {
    client: BinanceApiClient,
    pacer: RequestPacer,
    config: DiscoveryConfig,
}

impl TradeDiscoveryEngine {
    /// Creates an engine pacing requests per `config`.
    pub fn new(client: BinanceApiClient, config: DiscoveryConfig) -> Self {
        let pacer = RequestPacer::new(config.request_interval);
        Self::with_pacer(client, config, pacer)
    }

    /// Creates an engine with an explicit pacer.
    pub fn with_pacer(
        client: BinanceApiClient,
        config: DiscoveryConfig,
        pacer: RequestPacer,
    ) -> Self {
        Self {
            client,
            pacer,
            config,
        }
    }

    pub fn client(&self) -> &BinanceApiClient {
        &self.client
    }

    /// Runs the three discovery phases.
    ///
    /// Credentials are format-checked before any request is made. `progress`
    /// is dropped on return, which ends its paired stream.
    pub async fn discover(
        &self,
        credentials: &ApiCredentials,
        hints: &[String],
        market: MarketType,
        progress: ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        credentials
            .validate()
            .map_err(DiscoveryError::InvalidCredentials)?;

        info!("Starting trade discovery ({})", market.label());
        progress.emit(DiscoveryEvent::Started);

        let mut found = Discovered::default();

        let hints: Vec<String> = hints
            .iter()
            .map(|h| h.trim().to_uppercase())
            .filter(|h| !h.is_empty())
            .collect();

        if !hints.is_empty() {
            self.check_hints(&hints, credentials, market, &mut found, &progress, cancel)
                .await?;
        }

        info!(
            "After user symbols check: {} trades from {} symbols",
            found.trades.len(),
            found.symbols.len()
        );

        checkpoint(cancel)?;
        progress.emit(DiscoveryEvent::ScanningAccount);

        let account = self
            .client
            .fetch_account(credentials)
            .await
            .map_err(|e| match e {
                ApiError::Auth(_) => DiscoveryError::Signing(e),
                e => DiscoveryError::Account(e),
            })?;

        let assets = account.assets_with_balance();
        info!(
            "Found {} assets with balance: {}",
            assets.len(),
            assets.iter().take(10).cloned().collect::<Vec<_>>().join(", ")
        );
        progress.emit(DiscoveryEvent::AssetsFound {
            count: assets.len(),
        });

        let candidates = generate_candidates(&assets, &found.symbols);
        if candidates.is_empty() {
            return Ok(found.finish(&progress));
        }

        self.sweep_candidates(&candidates, credentials, &mut found, &progress, cancel)
            .await?;

        Ok(found.finish(&progress))
    }

    /// Phase 1: user-supplied symbols.
    async fn check_hints(
        &self,
        hints: &[String],
        credentials: &ApiCredentials,
        market: MarketType,
        found: &mut Discovered,
        progress: &ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<(), DiscoveryError> {
        info!("Checking {} user-specified symbols", hints.len());
        progress.emit(DiscoveryEvent::CheckingHints { count: hints.len() });

        for symbol in hints {
            checkpoint(cancel)?;
            self.pacer.until_ready().await;

            let mut found_on_spot = false;

            if market.includes_spot() {
                match self.check_symbol(symbol, credentials, MarketType::Spot).await {
                    SymbolFetch::Found(trades) => {
                        found.record(symbol, MarketType::Spot, trades, progress);
                        found_on_spot = true;
                    }
                    SymbolFetch::Skip(SkipReason::NoTrades) => {
                        debug!("{}: No SPOT trades found", symbol);
                    }
                    SymbolFetch::Skip(SkipReason::Failed(e)) => {
                        warn!("{}: Error - {}", symbol, e);
                    }
                    SymbolFetch::Fatal(e) => return Err(DiscoveryError::Signing(e)),
                }
            }

            let check_futures = match market {
                MarketType::Futures => true,
                MarketType::Both => !found_on_spot,
                MarketType::Spot => false,
            };

            if check_futures {
                checkpoint(cancel)?;
                debug!("Checking FUTURES for {}...", symbol);

                match self.check_symbol(symbol, credentials, MarketType::Futures).await {
                    SymbolFetch::Found(trades) => {
                        found.record(symbol, MarketType::Futures, trades, progress);
                    }
                    SymbolFetch::Skip(SkipReason::NoTrades) => {
                        debug!("{}: No FUTURES trades found", symbol);
                    }
                    SymbolFetch::Skip(SkipReason::Failed(e)) => {
                        info!("FUTURES not available for {}: {}", symbol, e);
                    }
                    SymbolFetch::Fatal(e) => return Err(DiscoveryError::Signing(e)),
                }
            }
        }

        Ok(())
    }

    /// Phase 3: generated candidates, spot only.
    async fn sweep_candidates(
        &self,
        candidates: &[String],
        credentials: &ApiCredentials,
        found: &mut Discovered,
        progress: &ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<(), DiscoveryError> {
        let total = candidates.len();
        let every = self.config.progress_every.max(1);

        info!("Checking {} additional pairs", total);
        progress.emit(DiscoveryEvent::CheckingCandidates { count: total });

        for (i, symbol) in candidates.iter().enumerate() {
            if i % every == 0 {
                progress.emit(DiscoveryEvent::Progress { checked: i, total });
            }

            checkpoint(cancel)?;
            self.pacer.until_ready().await;

            match self.check_symbol(symbol, credentials, MarketType::Spot).await {
                SymbolFetch::Found(trades) => {
                    found.record(symbol, MarketType::Spot, trades, progress);
                }
                SymbolFetch::Skip(SkipReason::NoTrades) => {}
                SymbolFetch::Skip(SkipReason::Failed(e)) => {
                    debug!("Skipping {}: {}", symbol, e);
                }
                SymbolFetch::Fatal(e) => return Err(DiscoveryError::Signing(e)),
            }
        }

        Ok(())
    }

    async fn check_symbol(
        &self,
        symbol: &str,
        credentials: &ApiCredentials,
        market: MarketType,
    ) -> SymbolFetch {
        SymbolFetch::from_result(
            self.client
                .fetch_my_trades(symbol, credentials, self.config.trade_limit, market)
                .await,
        )
    }

    /// Fetches spot trades for a fixed list of symbols.
    ///
    /// Symbols that fail are logged and skipped.
    pub async fn fetch_symbols(
        &self,
        symbols: &[String],
        credentials: &ApiCredentials,
        progress: ProgressSink,
    ) -> Vec<Trade> {
        let mut all_trades = Vec::new();
        let total = symbols.len();

        for (index, symbol) in symbols.iter().enumerate() {
            let symbol = symbol.trim();
            progress.emit(DiscoveryEvent::Checking {
                index,
                total,
                symbol: symbol.to_string(),
            });

            self.pacer.until_ready().await;

            match self
                .client
                .fetch_my_trades(symbol, credentials, self.config.trade_limit, MarketType::Spot)
                .await
            {
                Ok(trades) => all_trades.extend(trades),
                Err(e) => warn!("Skipping {} due to error: {}", symbol, e),
            }
        }

        all_trades
    }
}

impl std::fmt::Debug for TradeDiscoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeDiscoveryEngine")
            .field("client", &self.client)
            .field("pacer", &self.pacer)
            .field("config", &self.config)
            .finish()
    }
}

fn checkpoint(cancel: &CancelHandle) -> Result<(), DiscoveryError> {
    if cancel.is_cancelled() {
        warn!("Discovery cancelled");
        return Err(DiscoveryError::Cancelled);
    }
    Ok(())
}
