//! Lumina Infrastructure Library
//!
//! Shared process-level setup for Lumina binaries. Currently this is the
//! tracing subscriber installed at startup.

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};
