//! Binance trade journal.
//!
//! Reconstructs an account's trade history from the Binance REST API, which
//! only exposes trades one symbol at a time.
//!
//! # Architecture
//!
//! - **Connectors**: signed REST calls routed through a pluggable relay
//! - **Events**: exchange records normalized into [`Trade`]
//! - **Discovery**: hint, balance and candidate phases run strictly in
//!   sequence under a request pacer
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use trade_journal::config::{ClientConfig, DiscoveryConfig};
//! use trade_journal::connectors::{ApiCredentials, BinanceApiClient, DirectRelay};
//! use trade_journal::discovery::{CancelHandle, TradeDiscoveryEngine};
//! use trade_journal::events::{progress_channel, MarketType};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_env();
//!     let relay = Arc::new(DirectRelay::new(config.request_timeout)?);
//!     let client = BinanceApiClient::new(relay, config);
//!     let engine = TradeDiscoveryEngine::new(client, DiscoveryConfig::default());
//!
//!     let credentials = ApiCredentials::from_env().expect("credentials");
//!     let (sink, _stream) = progress_channel();
//!     let result = engine
//!         .discover(&credentials, &[], MarketType::Spot, sink, &CancelHandle::new())
//!         .await?;
//!
//!     println!("{} trades across {:?}", result.trades.len(), result.symbols);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connectors;
pub mod discovery;
pub mod events;
pub mod utils;

// Re-export commonly used types
pub use connectors::{ApiCredentials, BinanceApiClient};
pub use discovery::{DiscoveryResult, TradeDiscoveryEngine};
pub use events::{DiscoveryEvent, MarketType, Side, Trade};
