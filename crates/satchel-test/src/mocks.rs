//! Mock implementations for testing.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use satchel_plugins::{InstanceHandle, Loader, PluginError, PluginInstance, PluginResult};

/// A plugin instance that provides a fixed set of operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockInstance {
    /// Import identifier it was loaded from.
    pub import: String,
    /// Plugin root it was loaded from.
    pub root: PathBuf,
    /// Operations it claims to provide.
    pub operations: Vec<String>,
}

impl MockInstance {
    /// Create an instance providing `operations`.
    pub fn new<I, S>(import: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            import: import.into(),
            root: PathBuf::new(),
            operations: operations.into_iter().map(Into::into).collect(),
        }
    }

    /// Wrap in an instance handle.
    #[must_use]
    pub fn into_handle(self) -> InstanceHandle {
        Arc::new(self)
    }
}

impl PluginInstance for MockInstance {
    fn operations(&self) -> Vec<String> {
        self.operations.clone()
    }
}

/// One call to [`MockLoader::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCall {
    /// Plugin root passed to the loader.
    pub root: PathBuf,
    /// Import identifier passed to the loader.
    pub import: String,
    /// Symbol passed to the loader.
    pub symbol: String,
}

/// Loader that produces [`MockInstance`]s and records every call.
///
/// Cloning shares the call log, so a test can keep a clone after handing
/// the loader to a host.
#[derive(Debug, Clone, Default)]
pub struct MockLoader {
    plugins: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    calls: Arc<Mutex<Vec<LoadCall>>>,
}

impl MockLoader {
    /// Create a loader that knows no imports.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce instances providing `operations` for `import`.
    #[must_use]
    pub fn with_plugin<I, S>(mut self, import: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins.insert(
            import.into(),
            operations.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Fail every load of `import`.
    #[must_use]
    pub fn with_failure(mut self, import: impl Into<String>) -> Self {
        self.failing.insert(import.into());
        self
    }

    /// All calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<LoadCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Loader for MockLoader {
    fn load(&self, root: &Path, import: &str, symbol: &str) -> PluginResult<InstanceHandle> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LoadCall {
                root: root.to_path_buf(),
                import: import.to_string(),
                symbol: symbol.to_string(),
            });

        if self.failing.contains(import) {
            return Err(PluginError::Load {
                plugin: import.to_string(),
                message: "mock failure".into(),
            });
        }
        let operations = self.plugins.get(import).ok_or_else(|| PluginError::Load {
            plugin: import.to_string(),
            message: "unknown import".into(),
        })?;

        Ok(Arc::new(MockInstance {
            import: import.to_string(),
            root: root.to_path_buf(),
            operations: operations.clone(),
        }))
    }
}
