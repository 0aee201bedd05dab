//! Satchel Telemetry - Logging setup for the satchel plugin host.
//!
//! The engine crates only emit `tracing` events. This crate installs the
//! subscriber that renders them: level and per-target directive filtering,
//! four output formats, and stdout, stderr or rolling-file targets.
//!
//! # Example
//!
//! ```rust,no_run
//! use satchel_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), satchel_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("satchel_plugins=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LOG_LEVELS, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging, validate_level,
};
