//! Exchange clock synchronization.
//!
//! Signed requests carry `timestamp = local_now + offset`. The offset is
//! queried from the server-time endpoint on first use and memoized; a
//! failed query falls back to zero. Every write to the offset happens under
//! one lock, so a resync never loses to a slower first sync.

use chrono::Utc;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::relay::{HttpRelay, RelayError, RelayRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: i64,
}

/// Offset between the local clock and the exchange clock, in milliseconds.
#[derive(Debug)]
pub struct TimeSync {
    server_time_url: String,
    offset_ms: AtomicI64,
    initialized: AtomicBool,
    sync_lock: Mutex<()>,
}

impl TimeSync {
    /// Creates an unsynchronized clock for the exchange at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            server_time_url: format!("{}/api/v3/time", base_url),
            offset_ms: AtomicI64::new(0),
            initialized: AtomicBool::new(false),
            sync_lock: Mutex::new(()),
        }
    }

    /// Creates a clock that is already synchronized to `offset_ms`.
    pub fn with_offset(base_url: &str, offset_ms: i64) -> Self {
        Self {
            server_time_url: format!("{}/api/v3/time", base_url),
            offset_ms: AtomicI64::new(offset_ms),
            initialized: AtomicBool::new(true),
            sync_lock: Mutex::new(()),
        }
    }

    /// Returns true once an offset has been established.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Returns the memoized offset, querying the server on first use.
    ///
    /// Concurrent first callers share a single query.
    pub async fn offset(&self, relay: &dyn HttpRelay) -> i64 {
        if !self.is_initialized() {
            let _guard = self.sync_lock.lock().await;
            if !self.is_initialized() {
                self.store(self.query_offset(relay).await);
            }
        }

        self.offset_ms.load(Ordering::Acquire)
    }

    /// Re-queries the server and replaces the stored offset.
    ///
    /// Waits for any sync already in flight, then queries again.
    pub async fn resync(&self, relay: &dyn HttpRelay) -> i64 {
        let _guard = self.sync_lock.lock().await;
        let offset = self.query_offset(relay).await;
        self.store(offset);
        offset
    }

    fn store(&self, offset: i64) {
        self.offset_ms.store(offset, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
    }

    /// Local wall clock adjusted to the exchange clock.
    pub async fn now_ms(&self, relay: &dyn HttpRelay) -> i64 {
        let offset = self.offset(relay).await;
        Utc::now().timestamp_millis() + offset
    }

    /// Fetches the raw exchange server time.
    pub async fn server_time(&self, relay: &dyn HttpRelay) -> Result<i64, RelayError> {
        let value = relay
            .request(RelayRequest::get(&self.server_time_url, Vec::new()))
            .await?;

        let parsed: ServerTime =
            serde_json::from_value(value).map_err(|e| RelayError::Parse(e.to_string()))?;

        Ok(parsed.server_time)
    }

    async fn query_offset(&self, relay: &dyn HttpRelay) -> i64 {
        match self.server_time(relay).await {
            Ok(server_time) => {
                let offset = server_time - Utc::now().timestamp_millis();
                info!("Time synced with Binance. Offset: {}ms", offset);
                offset
            }
            Err(e) => {
                warn!("Failed to sync time with Binance, using local time: {}", e);
                0
            }
        }
    }
}
