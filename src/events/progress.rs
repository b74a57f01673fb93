//! Progress events emitted while discovering trades.
//!
//! The engine pushes events into a [`ProgressSink`]; the caller drains the
//! paired [`ProgressStream`] at its own pace. The stream ends once the sink
//! is dropped, which happens when the run that owns it finishes.

use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::trade::MarketType;

/// Observable milestones of a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// Credentials passed validation and the run has begun.
    Started,
    /// Phase 1 is about to check user-supplied symbols.
    CheckingHints { count: usize },
    /// Trades were found for a symbol.
    SymbolFound {
        symbol: String,
        market: MarketType,
        count: usize,
    },
    /// Phase 2 is querying account balances.
    ScanningAccount,
    /// Account balances yielded this many non-zero assets.
    AssetsFound { count: usize },
    /// Phase 3 is about to sweep generated candidates.
    CheckingCandidates { count: usize },
    /// Running count during the candidate sweep.
    Progress { checked: usize, total: usize },
    /// A multi-symbol fetch moved on to `symbol`.
    Checking {
        index: usize,
        total: usize,
        symbol: String,
    },
    /// The run finished.
    Complete { trades: usize, symbols: usize },
}

impl DiscoveryEvent {
    /// Human readable status line.
    pub fn message(&self) -> String {
        match self {
            DiscoveryEvent::Started => "Starting trade discovery...".to_string(),
            DiscoveryEvent::CheckingHints { count } => {
                format!("Checking {} specified symbols...", count)
            }
            DiscoveryEvent::SymbolFound {
                symbol,
                market,
                count,
            } => format!("✓ {}: {} {} trades", symbol, count, market),
            DiscoveryEvent::ScanningAccount => {
                "Scanning account for additional trading pairs...".to_string()
            }
            DiscoveryEvent::AssetsFound { count } => format!("Found {} assets in account", count),
            DiscoveryEvent::CheckingCandidates { count } => {
                format!("Checking {} additional pairs...", count)
            }
            DiscoveryEvent::Progress { checked, total } => {
                format!("Progress: {}/{} checked...", checked, total)
            }
            DiscoveryEvent::Checking {
                index,
                total,
                symbol,
            } => format!("Fetching {}... ({}/{})", symbol, index + 1, total),
            DiscoveryEvent::Complete { trades, symbols } => {
                format!("Complete! {} trades from {} symbols", trades, symbols)
            }
        }
    }
}

/// Producer half of a progress channel.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<DiscoveryEvent>>,
}

impl ProgressSink {
    /// A sink that drops every event.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    /// Publishes an event. Events are dropped silently once the stream
    /// side is gone.
    pub fn emit(&self, event: DiscoveryEvent) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Consumer half of a progress channel. Finite and single-use.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<DiscoveryEvent>,
}

impl ProgressStream {
    /// Receives the next event, or `None` once the run has finished.
    pub async fn recv(&mut self) -> Option<DiscoveryEvent> {
        self.rx.recv().await
    }
}

impl Stream for ProgressStream {
    type Item = DiscoveryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Creates a connected sink/stream pair.
pub fn progress_channel() -> (ProgressSink, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSink { tx: Some(tx) }, ProgressStream { rx })
}
