//! Configuration types.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration for the plugin host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Archive and cache locations.
    pub plugins: PluginsSection,
    /// Log level, format, and per-crate directives.
    pub logging: LoggingSection,
}

impl Config {
    /// Resolve relative plugin directories against `base`.
    ///
    /// Absolute paths and empty paths are left untouched.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.plugins.archive_dir = resolve(base, &self.plugins.archive_dir);
        self.plugins.cache_dir = resolve(base, &self.plugins.cache_dir);
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() || path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Where archives come from and where they are extracted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsSection {
    /// Directory scanned for `.zip` plugin archives.
    pub archive_dir: PathBuf,
    /// Directory holding one extracted subdirectory per plugin.
    pub cache_dir: PathBuf,
    /// Entry symbol resolved inside each loaded plugin.
    pub symbol: String,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("plugins"),
            cache_dir: PathBuf::from("plugins-cache"),
            symbol: "Plugin".to_owned(),
        }
    }
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["satchel_plugins=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
