//! Materializing plugin instances from extracted plugin directories.
//!
//! The host does not know how plugin code is executed. It hands the
//! [`Loader`] a plugin root, the import identifier from the metadata, and
//! the symbol to resolve, and gets back an instance handle.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{PluginError, PluginResult};
use crate::instance::InstanceHandle;

/// Symbol resolved in each plugin when none is configured.
pub const DEFAULT_SYMBOL: &str = "Plugin";

/// Produces a plugin instance for an extracted plugin.
pub trait Loader: Send + Sync {
    /// Load the plugin rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Load`] if the import or symbol cannot be
    /// resolved, or if constructing the instance fails.
    fn load(&self, root: &Path, import: &str, symbol: &str) -> PluginResult<InstanceHandle>;
}

/// Builds an instance given the plugin's root directory.
pub type PluginFactory = Box<dyn Fn(&Path) -> PluginResult<InstanceHandle> + Send + Sync>;

/// Loader for plugins compiled into the host.
///
/// Factories are keyed by import identifier and then by symbol, so a single
/// module can export more than one constructor.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use satchel_plugins::{FactoryLoader, InstanceHandle, PluginInstance};
///
/// struct Hello;
///
/// impl PluginInstance for Hello {
///     fn operations(&self) -> Vec<String> {
///         vec!["greet".into()]
///     }
/// }
///
/// let loader = FactoryLoader::new()
///     .with_default("github.com/user/hello", |_root| Ok(Arc::new(Hello) as InstanceHandle));
/// assert!(loader.has_import("github.com/user/hello"));
/// ```
#[derive(Default)]
pub struct FactoryLoader {
    factories: HashMap<String, HashMap<String, PluginFactory>>,
}

impl std::fmt::Debug for FactoryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbols: BTreeMap<&str, Vec<&str>> = self
            .factories
            .iter()
            .map(|(import, by_symbol)| {
                let mut names: Vec<&str> = by_symbol.keys().map(String::as_str).collect();
                names.sort_unstable();
                (import.as_str(), names)
            })
            .collect();
        f.debug_struct("FactoryLoader")
            .field("imports", &symbols)
            .finish()
    }
}

impl FactoryLoader {
    /// Create an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `import` under `symbol`.
    pub fn register<F>(&mut self, import: impl Into<String>, symbol: impl Into<String>, factory: F)
    where
        F: Fn(&Path) -> PluginResult<InstanceHandle> + Send + Sync + 'static,
    {
        self.factories
            .entry(import.into())
            .or_default()
            .insert(symbol.into(), Box::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_factory<F>(
        mut self,
        import: impl Into<String>,
        symbol: impl Into<String>,
        factory: F,
    ) -> Self
    where
        F: Fn(&Path) -> PluginResult<InstanceHandle> + Send + Sync + 'static,
    {
        self.register(import, symbol, factory);
        self
    }

    /// Register a factory under [`DEFAULT_SYMBOL`].
    #[must_use]
    pub fn with_default<F>(self, import: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Path) -> PluginResult<InstanceHandle> + Send + Sync + 'static,
    {
        self.with_factory(import, DEFAULT_SYMBOL, factory)
    }

    /// Whether any factory is registered for `import`.
    #[must_use]
    pub fn has_import(&self, import: &str) -> bool {
        self.factories.contains_key(import)
    }
}

impl Loader for FactoryLoader {
    fn load(&self, root: &Path, import: &str, symbol: &str) -> PluginResult<InstanceHandle> {
        let by_symbol = self.factories.get(import).ok_or_else(|| PluginError::Load {
            plugin: import.to_string(),
            message: "no factory registered for import".into(),
        })?;
        let factory = by_symbol.get(symbol).ok_or_else(|| PluginError::Load {
            plugin: import.to_string(),
            message: format!("symbol `{symbol}` not found"),
        })?;
        factory(root)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::instance::PluginInstance;

    struct Rooted(PathBuf);

    impl PluginInstance for Rooted {
        fn operations(&self) -> Vec<String> {
            vec!["root".into()]
        }
    }

    fn loader() -> FactoryLoader {
        FactoryLoader::new().with_default("example.com/rooted", |root| {
            Ok(Arc::new(Rooted(root.to_path_buf())) as InstanceHandle)
        })
    }

    #[test]
    fn test_load_passes_root() {
        let handle = loader()
            .load(Path::new("/cache/rooted-abc"), "example.com/rooted", DEFAULT_SYMBOL)
            .unwrap();
        let rooted = handle.downcast_ref::<Rooted>().unwrap();
        assert_eq!(rooted.0, PathBuf::from("/cache/rooted-abc"));
    }

    #[test]
    fn test_load_unknown_import() {
        let err = loader()
            .load(Path::new("/x"), "example.com/missing", DEFAULT_SYMBOL)
            .unwrap_err();
        assert!(matches!(err, PluginError::Load { plugin, .. } if plugin == "example.com/missing"));
    }

    #[test]
    fn test_load_unknown_symbol() {
        let err = loader()
            .load(Path::new("/x"), "example.com/rooted", "Other")
            .unwrap_err();
        assert!(matches!(err, PluginError::Load { message, .. } if message.contains("Other")));
    }

    #[test]
    fn test_factory_errors_propagate() {
        let loader = FactoryLoader::new().with_factory("broken", "Plugin", |_| {
            Err(PluginError::Load {
                plugin: "broken".into(),
                message: "init failed".into(),
            })
        });
        assert!(loader.load(Path::new("/x"), "broken", "Plugin").is_err());
        assert!(format!("{loader:?}").contains("broken"));
    }
}
