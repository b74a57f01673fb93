//! Account-wide trade discovery.

mod candidates;
mod engine;

pub use candidates::{generate_candidates, QUOTE_ASSETS};
pub use engine::{
    CancelHandle, DiscoveryError, DiscoveryResult, SkipReason, SymbolFetch, TradeDiscoveryEngine,
};
