//! Structured logging for the signal dashboard client.
//!
//! - JSON output in production (`RUST_ENV=production`), pretty otherwise
//! - `RUST_LOG`-style filtering with a crate-level debug default
//! - Logs go to stderr so command output on stdout stays clean

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat, LoggingConfig, DEFAULT_FILTER};
