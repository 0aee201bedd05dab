//! Errors raised while installing the subscriber.

use thiserror::Error;

/// Logging setup failure.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Bad level, directive or format name.
    #[error("invalid logging config: {0}")]
    ConfigError(String),

    /// A global subscriber is already installed, or installing one failed.
    #[error("cannot install log subscriber: {0}")]
    InitError(String),

    /// The log directory could not be created.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Shorthand for telemetry results.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
