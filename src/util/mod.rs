//! Shared utilities.

pub mod clock;
pub mod telemetry;

pub use clock::{now_epoch_secs, now_ms};
pub use telemetry::init_telemetry;
