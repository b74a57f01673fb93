//! Normalized data produced by the connectors.
//!
//! Raw exchange records are converted into [`Trade`] at the connector
//! boundary; nothing downstream reads exchange JSON directly.

mod progress;
mod trade;

pub use progress::{progress_channel, DiscoveryEvent, ProgressSink, ProgressStream};
pub use trade::{
    FuturesTradeRecord, MarketType, ParseMarketTypeError, Side, SpotTradeRecord, Trade,
};
