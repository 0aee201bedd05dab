//! Bridge from `satchel_config::Config` to engine and telemetry types.

use std::path::Path;

use satchel_config::Config;
use satchel_plugins::{FactoryLoader, PluginHost};
use satchel_telemetry::{FileRotation, LogConfig, LogFormat, LogTarget};

/// Convert config to [`LogConfig`].
///
/// `log_dir` switches output to daily rolling files in that directory.
pub(crate) fn to_log_config(cfg: &Config, verbose: bool, log_dir: Option<&Path>) -> LogConfig {
    let level = if verbose { "debug" } else { cfg.logging.level.as_str() };
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);

    let mut log_config = LogConfig::new(level)
        .with_format(format)
        .with_target(LogTarget::Stderr)
        .with_directives(cfg.logging.directives.iter().cloned());

    if let Some(dir) = log_dir {
        log_config = log_config.with_file_logging(dir, "satchel", FileRotation::Daily);
    }
    log_config
}

/// Build a host over the configured directories.
///
/// The CLI has no compiled-in plugins, so the loader table is empty; the
/// commands only drive indexing and reconciliation.
pub(crate) fn to_host(cfg: &Config) -> PluginHost {
    PluginHost::new(
        &cfg.plugins.archive_dir,
        &cfg.plugins.cache_dir,
        FactoryLoader::new(),
    )
    .with_symbol(&cfg.plugins.symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_config_follows_config() {
        let mut cfg = Config::default();
        cfg.logging.level = "warn".into();
        cfg.logging.format = "json".into();
        cfg.logging.directives = vec!["satchel_plugins=trace".into()];

        let lc = to_log_config(&cfg, false, None);
        assert_eq!(lc.level, "warn");
        assert_eq!(lc.format, LogFormat::Json);
        assert_eq!(lc.directives, vec!["satchel_plugins=trace".to_string()]);
        assert_eq!(lc.target, LogTarget::Stderr);
    }

    #[test]
    fn verbose_forces_debug() {
        let lc = to_log_config(&Config::default(), true, None);
        assert_eq!(lc.level, "debug");
    }

    #[test]
    fn log_dir_switches_to_files() {
        let lc = to_log_config(&Config::default(), false, Some(Path::new("/tmp/logs")));
        assert!(matches!(
            lc.target,
            LogTarget::File { ref dir, ref prefix, rotation: FileRotation::Daily }
                if dir == Path::new("/tmp/logs") && prefix == "satchel"
        ));
    }

    #[test]
    fn host_uses_configured_dirs_and_symbol() {
        let mut cfg = Config::default();
        cfg.plugins.symbol = "Entry".into();
        cfg.resolve_paths(Path::new("/srv"));

        let host = to_host(&cfg);
        assert_eq!(host.archive_dir(), Path::new("/srv/plugins"));
        assert_eq!(host.cache_dir(), Path::new("/srv/plugins-cache"));
        assert_eq!(host.symbol(), "Entry");
    }
}
