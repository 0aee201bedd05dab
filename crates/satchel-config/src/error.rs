use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    ReadError {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A config file is not valid TOML, or the merged tree does not match
    /// [`Config`](crate::Config).
    #[error("cannot parse config {}: {source}", path.display())]
    ParseError {
        /// The file, or a `<...>` placeholder for in-memory layers.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A config file exceeds [`MAX_CONFIG_FILE_SIZE`](crate::loader::MAX_CONFIG_FILE_SIZE).
    #[error("config {} is {size} bytes; the limit is {limit}", path.display())]
    TooLarge {
        /// The file.
        path: PathBuf,
        /// Its size in bytes.
        size: u64,
        /// The limit in bytes.
        limit: u64,
    },

    /// A merged value is out of range or malformed.
    #[error("invalid value for `{field}`: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// No home directory for the user config layer.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
