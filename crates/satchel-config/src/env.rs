//! Environment variable fallbacks.
//!
//! Env vars are fallbacks, not overrides: they apply only to fields no
//! config file set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "SATCHEL_ARCHIVE_DIR",
        field_path: "plugins.archive_dir",
    },
    EnvMapping {
        var_name: "SATCHEL_CACHE_DIR",
        field_path: "plugins.cache_dir",
    },
    EnvMapping {
        var_name: "SATCHEL_SYMBOL",
        field_path: "plugins.symbol",
    },
    EnvMapping {
        var_name: "SATCHEL_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "SATCHEL_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Names of every environment variable consulted.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name).collect()
}

/// Apply environment variable fallbacks to fields no config file set.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources.get(mapping.field_path).is_some_and(ConfigLayer::is_file) {
            continue;
        }
        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, toml::Value::String(val.clone()));
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

/// Set a dotted field in the tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, val: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), val);
    }
}

/// Collect the current process environment into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
