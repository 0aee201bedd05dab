//! Deep merge of TOML trees with per-field provenance.

use std::collections::HashMap;
use std::fmt;

/// The layer a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// The embedded `defaults.toml`.
    Defaults,
    /// `~/.satchel/config.toml`.
    User,
    /// `<workspace>/.satchel/config.toml`.
    Workspace,
    /// A file passed explicitly with `--config`.
    Explicit,
    /// A `SATCHEL_*` environment variable.
    Environment,
}

impl ConfigLayer {
    /// Whether the value was set by a config file rather than defaults or env.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::User | Self::Workspace | Self::Explicit)
    }
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Defaults => "defaults",
            Self::User => "user",
            Self::Workspace => "workspace",
            Self::Explicit => "explicit",
            Self::Environment => "environment",
        })
    }
}

/// Dotted field path (e.g. `"plugins.cache_dir"`) to the layer that set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Recursively deep-merge `overlay` into `base`.
///
/// Tables merge per key. Scalars and arrays from the overlay replace the
/// base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Deep-merge `overlay` into `base`, recording `layer` for every leaf the
/// overlay sets.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    deep_merge(base, overlay);
    record_leaves(overlay, "", layer, sources);
}

/// Record every leaf under `val` as coming from `layer`.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            record_leaves(child, &path, layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}
