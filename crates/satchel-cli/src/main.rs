//! Satchel CLI - inspect and synchronize an archive-backed plugin cache.
//!
//! The CLI drives indexing and reconciliation against the directories named
//! in the layered configuration. It does not load plugins; hosts that
//! compile plugins in do that through `satchel_plugins::PluginHost`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;
mod theme;

use commands::{index, list, plan, sync};
use satchel_config::Config;
use theme::Theme;

/// Satchel - archive-backed plugin host
#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Load this config file instead of the layered user/workspace files
    #[arg(short, long, global = true, env = "SATCHEL_CONFIG")]
    config: Option<PathBuf>,

    /// Workspace root; relative plugin directories resolve against it
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to rolling files in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the identities of all archives and cached plugins
    Index,
    /// Show what a sync would extract and evict
    Plan,
    /// Extract new archives and evict stale cache entries
    Sync,
    /// List cached plugins
    List {
        /// Only show plugins of this capability type
        #[arg(short = 't', long = "type")]
        capability: Option<String>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let workspace = match &cli.workspace {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let mut config = match &cli.config {
        Some(path) => Config::load_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load(Some(&workspace))?.config,
    };
    config.resolve_paths(&workspace);
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{}", Theme::fail(&format!("{e:#}")));
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let log_config = config_bridge::to_log_config(&config, cli.verbose, cli.log_dir.as_deref());
    if let Err(e) = satchel_telemetry::setup_logging(&log_config) {
        eprintln!("{}", Theme::warn(&format!("Failed to initialize logging: {e}")));
    }

    let mut host = config_bridge::to_host(&config);
    match &cli.command {
        Commands::Index => index::run(&host),
        Commands::Plan => plan::run(&host),
        Commands::Sync => sync::run(&mut host),
        Commands::List { capability } => {
            list::run(&config.plugins.cache_dir, capability.as_deref())
        },
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "satchel",
            "list",
            "--type",
            "greeter",
            "--workspace",
            "/srv",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.workspace, Some(PathBuf::from("/srv")));
        assert!(matches!(
            cli.command,
            Commands::List { capability: Some(ref c) } if c == "greeter"
        ));
    }

    #[test]
    fn explicit_config_file_resolves_against_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("satchel.toml");
        std::fs::write(&path, "[plugins]\narchive_dir = \"bundles\"\n").unwrap();

        let args: Vec<OsString> = vec![
            "satchel".into(),
            "plan".into(),
            "--config".into(),
            path.clone().into_os_string(),
            "--workspace".into(),
            tmp.path().as_os_str().to_owned(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.plugins.archive_dir, tmp.path().join("bundles"));
        assert_eq!(config.plugins.cache_dir, tmp.path().join("plugins-cache"));
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["satchel"]).is_err());
    }
}
