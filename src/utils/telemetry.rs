//! Telemetry and structured logging setup.
//!
//! Verbosity is controlled with `RUST_LOG`. Skipped candidate pairs are
//! logged at debug level, so `trade_journal=info` gives a quiet run.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "info,trade_journal=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes compact human-readable logging.
///
/// Example RUST_LOG values:
/// - `info` - All info and above
/// - `trade_journal=debug` - Debug for this crate, default for others
/// - `trade_journal=trace,reqwest=warn` - Include pacing waits
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initializes JSON logging.
pub fn init_telemetry_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
        .init();
}
