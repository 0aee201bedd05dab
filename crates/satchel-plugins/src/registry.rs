//! Plugin registry.
//!
//! Holds every plugin that passed capability validation, keyed by name.
//! A later registration under the same name replaces the earlier one.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::instance::InstanceHandle;
use crate::manifest::PluginConfig;

/// Root assigned to plugins registered directly by the host process.
pub const INTERNAL_ROOT: &str = "internal";

/// Where a plugin is in a load pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginState {
    /// Not yet looked at in this pass.
    Unseen,
    /// Present in the cache directory.
    Extracted,
    /// The loader returned an instance.
    Loaded,
    /// Validated and visible to queries.
    Registered,
    /// Dropped out of the pass with this reason.
    Failed(String),
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unseen => f.write_str("unseen"),
            Self::Extracted => f.write_str("extracted"),
            Self::Loaded => f.write_str("loaded"),
            Self::Registered => f.write_str("registered"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A registered plugin.
#[derive(Clone)]
pub struct PluginRecord {
    /// Decoded metadata.
    pub config: PluginConfig,
    /// Plugin directory, or `internal/<name>` for internal plugins.
    pub root: PathBuf,
    /// The loaded instance.
    pub instance: InstanceHandle,
}

impl fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.config.name)
            .field("type", &self.config.capability_type)
            .field("root", &self.root)
            .field("internal", &self.config.internal)
            .finish_non_exhaustive()
    }
}

impl PluginRecord {
    /// The plugin's lookup name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The capability type the plugin was validated against.
    #[must_use]
    pub fn capability_type(&self) -> &str {
        &self.config.capability_type
    }

    /// Whether the plugin was supplied by the host process.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.config.internal
    }
}

/// Registry of validated plugins.
///
/// An internal record displaced by a non-internal one of the same name is
/// held back and comes back once [`PluginRegistry::prune`] drops the record
/// that replaced it.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginRecord>,
    shadowed: HashMap<String, PluginRecord>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the one it replaced.
    pub fn insert(&mut self, record: PluginRecord) -> Option<PluginRecord> {
        let name = record.name().to_string();
        info!(
            plugin = %name,
            capability = %record.capability_type(),
            root = %record.root.display(),
            internal = record.is_internal(),
            "Registered plugin"
        );
        let incoming_internal = record.is_internal();
        if incoming_internal {
            self.shadowed.remove(&name);
        }
        let previous = self.plugins.insert(name.clone(), record);
        if let Some(prev) = &previous {
            debug!(plugin = %prev.name(), root = %prev.root.display(), "Replaced earlier registration");
            if prev.is_internal() && !incoming_internal {
                self.shadowed.insert(name, prev.clone());
            }
        }
        previous
    }

    /// Remove a record by name, along with any internal record it shadows.
    pub fn remove(&mut self, name: &str) -> Option<PluginRecord> {
        self.shadowed.remove(name);
        let removed = self.plugins.remove(name);
        if removed.is_some() {
            info!(plugin = %name, "Unregistered plugin");
        }
        removed
    }

    /// Look up a record by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.plugins.get(name)
    }

    /// The instance registered under `name`.
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<InstanceHandle> {
        self.plugins.get(name).map(|r| r.instance.clone())
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.plugins.keys().cloned().collect()
    }

    /// Names of plugins validated against `capability`, sorted.
    #[must_use]
    pub fn names_by_type(&self, capability: &str) -> BTreeSet<String> {
        self.plugins
            .values()
            .filter(|r| r.capability_type() == capability)
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Iterate over all records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginRecord> {
        self.plugins.values()
    }

    /// Drop every non-internal record whose name is not in `keep`.
    ///
    /// A dropped record that had displaced an internal one is replaced by
    /// that internal record. Returns the dropped names, sorted.
    pub fn prune(&mut self, keep: &BTreeSet<String>) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .plugins
            .values()
            .filter(|r| !r.is_internal() && !keep.contains(r.name()))
            .map(|r| r.name().to_string())
            .collect();
        dropped.sort();
        for name in &dropped {
            self.plugins.remove(name);
            info!(plugin = %name, "Unregistered plugin");
            if let Some(internal) = self.shadowed.remove(name) {
                info!(plugin = %name, root = %internal.root.display(), "Restored internal plugin");
                self.plugins.insert(name.clone(), internal);
            }
        }
        dropped
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
