//! Runtime configuration.
//!
//! Every value has a default suitable for production Binance endpoints and
//! can be overridden through environment variables.

use std::time::Duration;

use crate::connectors::DEFAULT_REQUEST_INTERVAL;

/// Default API endpoints.
pub const DEFAULT_SPOT_URL: &str = "https://api.binance.com";
pub const DEFAULT_FUTURES_URL: &str = "https://fapi.binance.com";

/// Staleness tolerance sent with every signed request.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 60_000;

/// Binance caps trade history pages at 1000 records.
pub const MAX_TRADE_LIMIT: u32 = 1000;

/// Connection settings for the Binance REST client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub spot_base_url: String,
    pub futures_base_url: String,
    pub recv_window_ms: u64,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            spot_base_url: DEFAULT_SPOT_URL.to_string(),
            futures_base_url: DEFAULT_FUTURES_URL.to_string(),
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Reads overrides from `BINANCE_API_URL`, `BINANCE_FUTURES_URL` and
    /// `BINANCE_RECV_WINDOW`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            spot_base_url: std::env::var("BINANCE_API_URL").unwrap_or(defaults.spot_base_url),
            futures_base_url: std::env::var("BINANCE_FUTURES_URL")
                .unwrap_or(defaults.futures_base_url),
            recv_window_ms: env_parse("BINANCE_RECV_WINDOW").unwrap_or(defaults.recv_window_ms),
            request_timeout: defaults.request_timeout,
        }
    }
}

/// Tuning for the discovery sweep.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Minimum spacing between per-symbol lookups.
    pub request_interval: Duration,
    /// Page size requested per symbol.
    pub trade_limit: u32,
    /// Emit a progress event every this many candidates.
    pub progress_every: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            request_interval: DEFAULT_REQUEST_INTERVAL,
            trade_limit: MAX_TRADE_LIMIT,
            progress_every: 5,
        }
    }
}

impl DiscoveryConfig {
    /// Reads overrides from `BINANCE_REQUEST_INTERVAL_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            request_interval: env_parse("BINANCE_REQUEST_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_interval),
            ..defaults
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}
