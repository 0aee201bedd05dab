//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_plugins(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_plugins(config: &Config) -> ConfigResult<()> {
    let p = &config.plugins;

    if p.archive_dir.as_os_str().is_empty() {
        return Err(invalid("plugins.archive_dir", "must not be empty"));
    }
    if p.cache_dir.as_os_str().is_empty() {
        return Err(invalid("plugins.cache_dir", "must not be empty"));
    }
    // Anything under the archive dir is indexed as an archive.
    if p.cache_dir.starts_with(&p.archive_dir) {
        return Err(ConfigError::ValidationError {
            field: "plugins.cache_dir".to_owned(),
            message: format!(
                "cache dir {} must not be inside the archive dir {}",
                p.cache_dir.display(),
                p.archive_dir.display()
            ),
        });
    }

    if !is_identifier(&p.symbol) {
        return Err(ConfigError::ValidationError {
            field: "plugins.symbol".to_owned(),
            message: format!("'{}' is not a valid symbol name", p.symbol),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "invalid log level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }
    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "invalid log format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }
    if let Some(empty) = l.directives.iter().position(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: format!("logging.directives[{empty}]"),
            message: "directive must not be empty".to_owned(),
        });
    }

    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.to_owned(),
    }
}
