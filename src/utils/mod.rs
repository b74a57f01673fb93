//! Process-level helpers.

mod telemetry;

pub use telemetry::{init_telemetry, init_telemetry_json};
