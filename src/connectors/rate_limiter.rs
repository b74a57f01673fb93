//! Request pacing for per-symbol trade lookups.
//!
//! Binance enforces a per-minute weight quota. Discovery issues hundreds of
//! lookups back to back, so each one waits for a token from a single-slot
//! bucket that refills once per interval.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tracing::trace;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Default spacing between per-symbol requests.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(150);

/// Token bucket that spaces requests at least `interval` apart.
pub struct RequestPacer {
    limiter: Option<Limiter>,
    interval: Duration,
}

impl RequestPacer {
    /// Creates a pacer with the given spacing. A zero interval disables
    /// pacing.
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval)
            .map(|quota| quota.allow_burst(NonZeroU32::MIN))
            .map(RateLimiter::direct);

        Self { limiter, interval }
    }

    /// Creates a pacer that never waits.
    pub fn disabled() -> Self {
        Self {
            limiter: None,
            interval: Duration::ZERO,
        }
    }

    /// Waits until the next request is allowed.
    pub async fn until_ready(&self) {
        if let Some(ref limiter) = self.limiter {
            trace!("Waiting for request slot");
            limiter.until_ready().await;
        }
    }

    /// Returns the configured spacing.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if this pacer ever waits.
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("interval", &self.interval)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
