//! Plugin error types.

use std::path::PathBuf;

/// Errors from indexing, reconciliation, loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// An entry in the archive directory is not a recognized archive file.
    #[error("not a plugin archive: {path}")]
    Format {
        /// The offending path.
        path: PathBuf,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode a plugin metadata file.
    #[error("metadata decode error in {path}: {message}")]
    ConfigDecode {
        /// Path to the metadata file, or `<memory>` for in-memory bytes.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// Failed to encode plugin metadata.
    #[error("metadata encode error: {0}")]
    ConfigEncode(String),

    /// The plugin declares a capability type that was never registered.
    #[error("unknown capability type: {0}")]
    UnknownCapabilityType(String),

    /// The plugin instance does not provide every operation of its contract.
    #[error("plugin {plugin} does not implement capability {capability} (missing: {})", missing.join(", "))]
    CapabilityNotImplemented {
        /// Name of the rejected plugin.
        plugin: String,
        /// Capability type the plugin declared.
        capability: String,
        /// Required operations the instance does not provide, sorted.
        missing: Vec<String>,
    },

    /// No plugin with this name is registered.
    #[error("no such plugin: {0}")]
    NoSuchPlugin(String),

    /// A load pass was started without both directories configured.
    #[error("{0} directory is not configured")]
    MissingDirectoryConfig(&'static str),

    /// The loader could not materialize the plugin instance.
    #[error("plugin load failed: {plugin} - {message}")]
    Load {
        /// The plugin that failed to load.
        plugin: String,
        /// Failure reason.
        message: String,
    },

    /// Archive extraction failure.
    #[error("extraction error for {archive}: {message}")]
    Extraction {
        /// The archive being extracted.
        archive: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Path traversal detected in an archive entry.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry path.
        path: String,
    },

    /// Unsafe entry type in archive (e.g. symlink).
    #[error("unsafe archive entry type '{entry_type}' at {path}")]
    UnsafeEntryType {
        /// The entry type that was rejected.
        entry_type: String,
        /// The path of the entry.
        path: String,
    },

    /// An extracted archive did not contain a metadata file at its root.
    #[error("no plugin metadata found at {path}")]
    MissingMetadata {
        /// Where the metadata file was expected.
        path: PathBuf,
    },
}

impl From<walkdir::Error> for PluginError {
    fn from(e: walkdir::Error) -> Self {
        Self::Io(e.into())
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
