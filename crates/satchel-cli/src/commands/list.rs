//! List command - show cached plugins with their metadata.

use std::path::{Path, PathBuf};

use colored::Colorize;
use satchel_plugins::{Identity, PluginResult, YamlCodec, index_cache, read_metadata};

use super::display_under;
use crate::theme::Theme;

/// One cached plugin as shown by `satchel list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListRow {
    pub(crate) name: String,
    pub(crate) capability_type: String,
    pub(crate) identity: Identity,
    pub(crate) root: PathBuf,
}

/// Read every cached plugin's metadata, optionally filtered by type.
pub(crate) fn cached_plugins(
    cache_dir: &Path,
    capability: Option<&str>,
) -> PluginResult<Vec<ListRow>> {
    let codec = YamlCodec;
    let cache = index_cache(cache_dir, &codec)?;

    let mut rows = Vec::new();
    for entry in cache.entries() {
        let (config, _) = read_metadata(&codec, &entry.metadata_path)?;
        if capability.is_some_and(|c| c != config.capability_type) {
            continue;
        }
        rows.push(ListRow {
            root: entry.root().to_path_buf(),
            name: config.name,
            capability_type: config.capability_type,
            identity: entry.identity,
        });
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(rows)
}

/// Print cached plugins.
pub(crate) fn run(cache_dir: &Path, capability: Option<&str>) -> anyhow::Result<()> {
    let rows = cached_plugins(cache_dir, capability)?;

    if rows.is_empty() {
        println!("{}", Theme::note("No cached plugins"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Cached plugins"));
    println!(
        "{:<20} {:<16} {:<14} {}",
        "NAME".dimmed(),
        "TYPE".dimmed(),
        "IDENTITY".dimmed(),
        "ROOT".dimmed()
    );
    println!("{}", Theme::rule());
    for row in rows {
        let identity = match row.identity.archive_hash() {
            Some(hash) => hash.short_hex(12),
            None => "local".to_string(),
        };
        println!(
            "{:<20} {:<16} {} {}",
            row.name.bold(),
            row.capability_type,
            Theme::identity(&format!("{identity:<14}"), row.identity.is_local()),
            Theme::muted(&display_under(&row.root, cache_dir))
        );
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use satchel_plugins::{FactoryLoader, PluginHost};
    use satchel_test::{ArchiveBuilder, TestDirs, test_plugin_config, write_cached_plugin};

    use super::*;

    #[test]
    fn lists_archived_and_local_plugins() {
        let dirs = TestDirs::new().unwrap();
        ArchiveBuilder::new()
            .with_folder("hello")
            .with_metadata(&test_plugin_config("hello", "greeter"))
            .unwrap()
            .write_to(&dirs.archive("hello"))
            .unwrap();
        write_cached_plugin(
            &dirs.cache,
            "bench",
            &test_plugin_config("bench", "middleware").with_local(true),
        )
        .unwrap();
        PluginHost::new(&dirs.archives, &dirs.cache, FactoryLoader::new())
            .reconcile()
            .unwrap();

        let rows = cached_plugins(&dirs.cache, None).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["bench", "hello"]);
        assert!(rows[0].identity.is_local());
        assert!(rows[1].identity.archive_hash().is_some());

        let greeters = cached_plugins(&dirs.cache, Some("greeter")).unwrap();
        assert_eq!(greeters.len(), 1);
        assert_eq!(greeters[0].capability_type, "greeter");
    }

    #[test]
    fn empty_cache_lists_nothing() {
        let dirs = TestDirs::new().unwrap();
        assert!(cached_plugins(&dirs.cache, None).unwrap().is_empty());
    }
}
