//! Index command - show archive and cache identities.

use colored::Colorize;
use satchel_plugins::PluginHost;

use super::display_under;
use crate::theme::Theme;

/// Print both indexes side by side.
pub(crate) fn run(host: &PluginHost) -> anyhow::Result<()> {
    let (archives, cache) = host.index()?;

    println!("\n{}", Theme::header("Archives"));
    println!("{}", Theme::muted(&host.archive_dir().display().to_string()));
    println!("{}", Theme::rule());
    if archives.is_empty() {
        println!("{}", Theme::note("No archives found"));
    }
    for (hash, path) in archives.iter() {
        println!(
            "{}  {}",
            Theme::identity(&hash.short_hex(12), false),
            display_under(path, host.archive_dir())
        );
    }

    println!("\n{}", Theme::header("Cache"));
    println!("{}", Theme::muted(&host.cache_dir().display().to_string()));
    println!("{}", Theme::rule());
    if cache.is_empty() {
        println!("{}", Theme::note("No cached plugins"));
    }
    for entry in cache.entries() {
        let identity = match entry.identity.archive_hash() {
            Some(hash) => hash.short_hex(12),
            None => "local".to_string(),
        };
        println!(
            "{}  {}",
            Theme::identity(&format!("{identity:<12}"), entry.is_local()),
            display_under(entry.root(), host.cache_dir())
        );
    }
    for path in &cache.unstamped {
        println!(
            "{}",
            Theme::warn(&format!(
                "{} has no hash stamp",
                display_under(path, host.cache_dir())
            ))
        );
    }
    for path in &cache.redundant {
        println!(
            "{}",
            Theme::warn(&format!(
                "{} duplicates another entry",
                display_under(path, host.cache_dir())
            ))
        );
    }

    println!(
        "\n{} archives, {} cached",
        archives.len().to_string().bold(),
        cache.len().to_string().bold()
    );
    Ok(())
}
