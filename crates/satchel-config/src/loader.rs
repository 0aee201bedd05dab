//! Config file discovery and layered loading.
//!
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge `~/.satchel/config.toml` (user)
//! 3. Merge `{workspace}/.satchel/config.toml` (workspace)
//! 4. Apply `SATCHEL_*` env var fallbacks for fields no file set
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::apply_env_fallbacks;
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Directory name holding user and workspace config files.
pub const CONFIG_DIR_NAME: &str = ".satchel";

/// Config file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// A merged configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Layer that set each dotted field path.
    pub field_sources: FieldSources,
    /// Files merged, in precedence order.
    pub loaded_files: Vec<PathBuf>,
}

impl ResolvedConfig {
    /// Layer that set `field`, if any.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }
}

/// Load with the full precedence chain using the process environment.
///
/// `home_override` replaces the `~/.satchel` directory itself.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is unreadable, malformed or
/// oversized, or if the merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let user_dir = match home_override {
        Some(dir) => dir.to_path_buf(),
        None => home_directory()?.join(CONFIG_DIR_NAME),
    };
    load_with_env(
        workspace_root,
        Some(&user_dir),
        &crate::env::collect_env_vars(),
    )
}

/// Load with the full precedence chain against an explicit environment.
///
/// `user_dir` is the directory holding the user `config.toml`; `None` skips
/// the user layer.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: BuildHasher>(
    workspace_root: Option<&Path>,
    user_dir: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<embedded defaults>"),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    let mut candidates = Vec::new();
    if let Some(dir) = user_dir {
        candidates.push((dir.join(CONFIG_FILE_NAME), ConfigLayer::User));
    }
    if let Some(root) = workspace_root {
        candidates.push((
            root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            ConfigLayer::Workspace,
        ));
    }

    let mut loaded_files = Vec::new();
    for (path, layer) in candidates {
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge_tracking(&mut merged, &overlay, &layer, &mut field_sources);
            info!(path = %path.display(), layer = %layer, "loaded config");
            loaded_files.push(path);
        }
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: PathBuf::from("<merged config>"),
                source: e,
            })?;
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a single config file on top of the defaults (no layering, no env).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, oversized,
/// malformed, or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_capped(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Read a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match read_capped(path) {
        Ok(c) => c,
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(e),
    };

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Read a file in one go and reject it if it exceeds the size cap.
fn read_capped(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }
    Ok(content)
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
