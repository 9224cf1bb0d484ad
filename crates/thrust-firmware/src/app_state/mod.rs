//! Firmware-specific application state extensions
//!
//! Re-exports the hardware-independent stand state from `thrust_core` and
//! adds the ESP32-S3 wiring for the load cell and the ignition gate.

mod hardware;

pub use hardware::*;

// Re-export all shared app state types from thrust-core
pub use thrust_core::app_state::*;
