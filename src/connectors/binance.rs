//! REST API client for Binance.
//!
//! Provides access to:
//! - Spot API: server time, account balances, spot trade history
//! - USDⓈ-M futures API: futures trade history

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{ClientConfig, MAX_TRADE_LIMIT};
use crate::events::{FuturesTradeRecord, MarketType, SpotTradeRecord, Trade};

use super::auth::{ApiCredentials, AuthError};
use super::relay::{HttpRelay, RelayError, RelayRequest};
use super::time_sync::TimeSync;

const ACCOUNT_PATH: &str = "/api/v3/account";
const SPOT_TRADES_PATH: &str = "/api/v3/myTrades";
const FUTURES_TRADES_PATH: &str = "/fapi/v1/userTrades";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Relay failed: {0}")]
    Relay(RelayError),

    #[error("Signing failed: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Binance error {code} (HTTP {status}): {msg}")]
    Exchange { status: u16, code: i64, msg: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Trades can only be fetched from one market at a time, got {0}")]
    InvalidMarket(MarketType),
}

/// Error body returned by Binance on failure.
#[derive(Debug, Deserialize)]
struct ExchangeErrorBody {
    code: i64,
    msg: String,
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Http { status, body } => {
                match serde_json::from_str::<ExchangeErrorBody>(&body) {
                    Ok(parsed) => ApiError::Exchange {
                        status,
                        code: parsed.code,
                        msg: parsed.msg,
                    },
                    Err(_) => ApiError::Http { status, body },
                }
            }
            other => ApiError::Relay(other),
        }
    }
}

/// Coarse classification used for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    RateLimited,
    InvalidSymbol,
    ConnectionFailed,
    Other,
}

impl ApiError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Relay(RelayError::Transport(_) | RelayError::Disconnected) => {
                ErrorKind::ConnectionFailed
            }
            ApiError::Exchange { status, code, msg } => {
                let msg = msg.to_ascii_lowercase();
                if *status == 429 || *status == 418 || *code == -1003 {
                    ErrorKind::RateLimited
                } else if *code == -1121 || msg.contains("invalid symbol") {
                    ErrorKind::InvalidSymbol
                } else if *status == 401
                    || matches!(*code, -2014 | -2015)
                    || msg.contains("api-key")
                {
                    ErrorKind::Unauthorized
                } else {
                    ErrorKind::Other
                }
            }
            ApiError::Http { status, .. } => match status {
                401 => ErrorKind::Unauthorized,
                418 | 429 => ErrorKind::RateLimited,
                _ => ErrorKind::Other,
            },
            _ => ErrorKind::Other,
        }
    }

    /// Short message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Unauthorized => "API key does not have permission".to_string(),
            ErrorKind::RateLimited => "Rate limit exceeded, please wait".to_string(),
            ErrorKind::InvalidSymbol => "Invalid trading pair symbol".to_string(),
            ErrorKind::ConnectionFailed => "Failed to connect to Binance API".to_string(),
            ErrorKind::Other => self.to_string(),
        }
    }
}

/// Binance API client for REST operations.
///
/// All requests go through the configured [`HttpRelay`].
pub struct BinanceApiClient {
    relay: Arc<dyn HttpRelay>,
    config: ClientConfig,
    time_sync: TimeSync,
}

impl BinanceApiClient {
    /// Creates a client whose clock syncs lazily on the first signed call.
    pub fn new(relay: Arc<dyn HttpRelay>, config: ClientConfig) -> Self {
        let time_sync = TimeSync::new(&config.spot_base_url);
        Self::with_time_sync(relay, config, time_sync)
    }

    /// Creates a client with an explicit clock.
    pub fn with_time_sync(
        relay: Arc<dyn HttpRelay>,
        config: ClientConfig,
        time_sync: TimeSync,
    ) -> Self {
        Self {
            relay,
            config,
            time_sync,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn time_sync(&self) -> &TimeSync {
        &self.time_sync
    }

    /// Fetches the exchange server time in epoch milliseconds.
    pub async fn server_time(&self) -> Result<i64, ApiError> {
        Ok(self.time_sync.server_time(self.relay.as_ref()).await?)
    }

    /// Forces a clock resync and returns the new offset.
    pub async fn sync_time(&self) -> i64 {
        self.time_sync.resync(self.relay.as_ref()).await
    }

    /// Builds a signed query string.
    ///
    /// `recvWindow` and `timestamp` are appended after `params`, and the
    /// signature covers everything before it.
    pub async fn signed_query(
        &self,
        mut params: Vec<(String, String)>,
        credentials: &ApiCredentials,
    ) -> Result<String, ApiError> {
        let timestamp = self.time_sync.now_ms(self.relay.as_ref()).await;

        params.push(("recvWindow".to_string(), self.config.recv_window_ms.to_string()));
        params.push(("timestamp".to_string(), timestamp.to_string()));

        let query = build_query_string(&params);
        let signature = credentials.sign(&query)?;

        Ok(format!("{}&signature={}", query, signature))
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        params: Vec<(String, String)>,
        credentials: &ApiCredentials,
    ) -> Result<T, ApiError> {
        let query = self.signed_query(params, credentials).await?;
        let url = format!("{}{}?{}", base_url, path, query);

        let value = self
            .relay
            .request(RelayRequest::get(url, credentials.auth_headers()))
            .await?;

        serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Fetches account balances and permissions.
    pub async fn fetch_account(
        &self,
        credentials: &ApiCredentials,
    ) -> Result<AccountInfo, ApiError> {
        debug!("Fetching account info...");

        let account: AccountInfo = self
            .signed_get(&self.config.spot_base_url, ACCOUNT_PATH, Vec::new(), credentials)
            .await?;

        debug!(
            "Account: type={} canTrade={} canWithdraw={} canDeposit={} permissions={:?} updated={}",
            account.account_type,
            account.can_trade,
            account.can_withdraw,
            account.can_deposit,
            account.permissions,
            account.update_time
        );

        Ok(account)
    }

    /// Fetches the most recent trades for one symbol on one market.
    ///
    /// `limit` is capped at 1000. `market` must be spot or futures.
    pub async fn fetch_my_trades(
        &self,
        symbol: &str,
        credentials: &ApiCredentials,
        limit: u32,
        market: MarketType,
    ) -> Result<Vec<Trade>, ApiError> {
        let symbol = symbol.to_uppercase();
        let params = vec![
            ("symbol".to_string(), symbol.clone()),
            ("limit".to_string(), limit.min(MAX_TRADE_LIMIT).to_string()),
        ];

        debug!("Fetching {} trades for {}...", market.label(), symbol);

        let trades: Vec<Trade> = match market {
            MarketType::Spot => {
                let records: Vec<SpotTradeRecord> = self
                    .signed_get(&self.config.spot_base_url, SPOT_TRADES_PATH, params, credentials)
                    .await?;
                records.into_iter().map(Trade::from).collect()
            }
            MarketType::Futures => {
                let records: Vec<FuturesTradeRecord> = self
                    .signed_get(
                        &self.config.futures_base_url,
                        FUTURES_TRADES_PATH,
                        params,
                        credentials,
                    )
                    .await?;
                records.into_iter().map(Trade::from).collect()
            }
            MarketType::Both => return Err(ApiError::InvalidMarket(market)),
        };

        debug!("{} ({}) returned {} trades", symbol, market.label(), trades.len());
        Ok(trades)
    }

    /// Checks that the credentials can read the account.
    ///
    /// Resyncs the clock first so a stale offset cannot fail the check.
    pub async fn test_connection(&self, credentials: &ApiCredentials) -> bool {
        self.sync_time().await;

        match self.fetch_account(credentials).await {
            Ok(_) => {
                info!("Connection test succeeded");
                true
            }
            Err(e) => {
                error!("Connection test failed: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for BinanceApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceApiClient")
            .field("spot_base_url", &self.config.spot_base_url)
            .field("futures_base_url", &self.config.futures_base_url)
            .field("time_synced", &self.time_sync.is_initialized())
            .finish()
    }
}

// ============ Response Types ============

/// Response from `GET /api/v3/account`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default)]
    pub can_trade: bool,
    #[serde(default)]
    pub can_withdraw: bool,
    #[serde(default)]
    pub can_deposit: bool,
    #[serde(default)]
    pub update_time: i64,
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    /// Assets with a non-zero free or locked balance, in account order.
    pub fn assets_with_balance(&self) -> Vec<String> {
        self.balances
            .iter()
            .filter(|b| b.is_nonzero())
            .map(|b| b.asset.clone())
            .collect()
    }
}

/// A single asset balance.
#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

impl Balance {
    pub fn is_nonzero(&self) -> bool {
        let positive = |v: &str| v.parse::<f64>().map(|n| n > 0.0).unwrap_or(false);
        positive(&self.free) || positive(&self.locked)
    }
}

// ============ Helper Functions ============

/// Joins parameters into `k=v&k=v` in insertion order.
fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::relay::mock::{MockRelay, MockReply};
    use crate::events::Side;
    use serde_json::json;

    const KEY: &str = "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A";
    const SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    fn client(mock: &MockRelay) -> BinanceApiClient {
        let config = ClientConfig::default();
        let time_sync = TimeSync::with_offset(&config.spot_base_url, 0);
        BinanceApiClient::with_time_sync(Arc::new(mock.clone()), config, time_sync)
    }

    fn creds() -> ApiCredentials {
        ApiCredentials::new(KEY, SECRET)
    }

    fn spot_trade(order_id: u64, is_buyer: bool) -> serde_json::Value {
        json!({
            "symbol": "BTCUSDT",
            "id": order_id * 10,
            "orderId": order_id,
            "price": "42000.00",
            "qty": "0.01",
            "quoteQty": "420.00",
            "commission": "0.00001",
            "commissionAsset": "BTC",
            "time": 1700000000000i64,
            "isBuyer": is_buyer,
            "isMaker": false,
            "isBestMatch": true
        })
    }

    #[tokio::test]
    async fn test_signed_query_layout() {
        let mock = MockRelay::new();
        let client = client(&mock);

        let query = client
            .signed_query(vec![("symbol".to_string(), "BTCUSDT".to_string())], &creds())
            .await
            .unwrap();

        let (unsigned, signature) = query.split_once("&signature=").unwrap();
        assert!(unsigned.starts_with("symbol=BTCUSDT&recvWindow=60000&timestamp="));
        assert_eq!(signature, creds().sign(unsigned).unwrap());
        assert_eq!(signature.len(), 64);
        // A pre-synced clock must not hit the server.
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_spot_trades() {
        let mock = MockRelay::new();
        mock.on(
            "/api/v3/myTrades",
            Some("BTCUSDT"),
            MockReply::Json(json!([spot_trade(1, true), spot_trade(2, false)])),
        );
        let client = client(&mock);

        let trades = client
            .fetch_my_trades("btcusdt", &creds(), 5000, MarketType::Spot)
            .await
            .unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[1].side, Side::Sell);

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0]
            .url
            .starts_with("https://api.binance.com/api/v3/myTrades?symbol=BTCUSDT&limit=1000&"));
        assert_eq!(
            calls[0].headers,
            vec![("X-MBX-APIKEY".to_string(), KEY.to_string())]
        );
    }

    #[tokio::test]
    async fn test_fetch_futures_trades_uses_futures_endpoint() {
        let mock = MockRelay::new();
        mock.on(
            "/fapi/v1/userTrades",
            Some("ETHUSDT"),
            MockReply::Json(json!([{
                "symbol": "ETHUSDT",
                "id": 1,
                "orderId": 77,
                "side": "SELL",
                "price": "2000",
                "qty": "1",
                "commission": "0.4",
                "commissionAsset": "USDT",
                "time": 1700000000000i64,
                "maker": true,
                "buyer": false
            }])),
        );
        let client = client(&mock);

        let trades = client
            .fetch_my_trades("ETHUSDT", &creds(), 500, MarketType::Futures)
            .await
            .unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, Side::Sell);
        assert!(trades[0].is_maker);
        assert!(mock.calls()[0]
            .url
            .starts_with("https://fapi.binance.com/fapi/v1/userTrades?symbol=ETHUSDT&limit=500&"));
    }

    #[tokio::test]
    async fn test_exchange_error_body_is_parsed() {
        let mock = MockRelay::new();
        let client = client(&mock);

        let err = client
            .fetch_my_trades("NOPEUSDT", &creds(), 1000, MarketType::Spot)
            .await
            .unwrap_err();

        match &err {
            ApiError::Exchange { status, code, msg } => {
                assert_eq!(*status, 400);
                assert_eq!(*code, -1121);
                assert_eq!(msg, "Invalid symbol.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.kind(), ErrorKind::InvalidSymbol);
        assert_eq!(err.user_message(), "Invalid trading pair symbol");
    }

    #[tokio::test]
    async fn test_both_market_is_rejected_without_request() {
        let mock = MockRelay::new();
        let client = client(&mock);

        let err = client
            .fetch_my_trades("BTCUSDT", &creds(), 1000, MarketType::Both)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidMarket(MarketType::Both)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connection_check() {
        let mock = MockRelay::new();
        mock.on("/api/v3/time", None, MockReply::Json(json!({"serverTime": 1})));
        mock.on(
            "/api/v3/account",
            None,
            MockReply::Status(401, r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#.to_string()),
        );
        let client = client(&mock);

        assert!(!client.test_connection(&creds()).await);
        assert_eq!(mock.calls_to("/api/v3/time"), 1);

        mock.on(
            "/api/v3/account",
            None,
            MockReply::Json(json!({"balances": []})),
        );
        assert!(client.test_connection(&creds()).await);
    }

    #[test]
    fn test_error_classification() {
        let unauthorized = ApiError::from(RelayError::Http {
            status: 401,
            body: r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#
                .to_string(),
        });
        assert_eq!(unauthorized.kind(), ErrorKind::Unauthorized);

        let throttled = ApiError::from(RelayError::Http {
            status: 429,
            body: "Too many requests".to_string(),
        });
        assert!(matches!(throttled, ApiError::Http { status: 429, .. }));
        assert_eq!(throttled.user_message(), "Rate limit exceeded, please wait");

        let offline = ApiError::from(RelayError::Transport("dns error".to_string()));
        assert_eq!(offline.kind(), ErrorKind::ConnectionFailed);

        let other = ApiError::Parse("bad json".to_string());
        assert_eq!(other.user_message(), "Failed to parse response: bad json");
    }

    #[test]
    fn test_assets_with_balance() {
        let account: AccountInfo = serde_json::from_value(json!({
            "canTrade": true,
            "accountType": "SPOT",
            "balances": [
                {"asset": "BTC", "free": "0.00000000", "locked": "0.00000000"},
                {"asset": "ETH", "free": "1.50000000", "locked": "0.00000000"},
                {"asset": "BNB", "free": "0.00000000", "locked": "2.00000000"},
                {"asset": "LTC", "free": "garbage", "locked": "0"}
            ]
        }))
        .unwrap();

        assert_eq!(account.assets_with_balance(), vec!["ETH", "BNB"]);
        assert!(account.can_trade);
    }
}
