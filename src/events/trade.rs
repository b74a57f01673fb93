//! Normalized trade records.
//!
//! Spot and futures trade endpoints return slightly different shapes. Both
//! collapse into [`Trade`] before anything else sees them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Derives the side from the spot `isBuyer` flag.
    pub fn from_is_buyer(is_buyer: bool) -> Self {
        if is_buyer {
            Side::Buy
        } else {
            Side::Sell
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Which market(s) a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    #[default]
    Spot,
    Futures,
    Both,
}

impl MarketType {
    /// Whether spot trades should be checked.
    pub fn includes_spot(&self) -> bool {
        matches!(self, MarketType::Spot | MarketType::Both)
    }

    /// Upper-case label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            MarketType::Spot => "SPOT",
            MarketType::Futures => "FUTURES",
            MarketType::Both => "BOTH",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::Spot => write!(f, "spot"),
            MarketType::Futures => write!(f, "futures"),
            MarketType::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown market type: {0} (expected spot, futures or both)")]
pub struct ParseMarketTypeError(String);

impl FromStr for MarketType {
    type Err = ParseMarketTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spot" => Ok(MarketType::Spot),
            "futures" => Ok(MarketType::Futures),
            "both" => Ok(MarketType::Both),
            _ => Err(ParseMarketTypeError(s.to_string())),
        }
    }
}

/// A single fill on the account, normalized across markets.
///
/// Decimal fields keep the exchange's string representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub symbol: String,
    pub order_id: u64,
    pub side: Side,
    pub price: String,
    pub qty: String,
    pub commission: String,
    pub commission_asset: String,
    /// Epoch milliseconds.
    pub time: i64,
    pub is_maker: bool,
    pub market: MarketType,
}

// ============ Raw Exchange Records ============

/// Record from `GET /api/v3/myTrades`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotTradeRecord {
    pub symbol: String,
    pub order_id: u64,
    pub price: String,
    pub qty: String,
    pub commission: String,
    pub commission_asset: String,
    pub time: i64,
    pub is_buyer: bool,
    pub is_maker: bool,
}

impl From<SpotTradeRecord> for Trade {
    fn from(record: SpotTradeRecord) -> Self {
        Trade {
            symbol: record.symbol,
            order_id: record.order_id,
            side: Side::from_is_buyer(record.is_buyer),
            price: record.price,
            qty: record.qty,
            commission: record.commission,
            commission_asset: record.commission_asset,
            time: record.time,
            is_maker: record.is_maker,
            market: MarketType::Spot,
        }
    }
}

/// Record from `GET /fapi/v1/userTrades`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesTradeRecord {
    pub symbol: String,
    pub order_id: u64,
    pub side: Side,
    pub price: String,
    pub qty: String,
    pub commission: String,
    pub commission_asset: String,
    pub time: i64,
    pub maker: bool,
}

impl From<FuturesTradeRecord> for Trade {
    fn from(record: FuturesTradeRecord) -> Self {
        Trade {
            symbol: record.symbol,
            order_id: record.order_id,
            side: record.side,
            price: record.price,
            qty: record.qty,
            commission: record.commission,
            commission_asset: record.commission_asset,
            time: record.time,
            is_maker: record.maker,
            market: MarketType::Futures,
        }
    }
}
