//! Connectors for the Binance REST API.
//!
//! This module provides low-level clients for talking to Binance: request
//! signing, clock sync, request pacing, and the relay every call goes
//! through. Raw responses are normalized through the events layer before
//! leaving this module.

mod auth;
mod binance;
pub mod rate_limiter;
pub mod relay;
mod time_sync;

pub use auth::{validate_api_key, validate_api_secret, ApiCredentials, AuthError, API_KEY_HEADER};
pub use binance::{AccountInfo, ApiError, Balance, BinanceApiClient, ErrorKind};
pub use rate_limiter::{RequestPacer, DEFAULT_REQUEST_INTERVAL};
pub use relay::{
    relay_channel, ChannelRelay, DirectRelay, HttpRelay, RelayError, RelayRequest, RelayResponse,
    RelayWorker,
};
pub use time_sync::TimeSync;
