//! Sync command - extract new archives and evict stale cache entries.

use satchel_plugins::PluginHost;
use tracing::info;

use super::display_under;
use crate::theme::Theme;

/// Apply the reconciliation plan. No plugins are loaded.
pub(crate) fn run(host: &mut PluginHost) -> anyhow::Result<()> {
    let outcome = host.reconcile()?;
    info!(
        extracted = outcome.extracted.len(),
        evicted = outcome.evicted.len(),
        cached = outcome.entries.len(),
        "sync complete"
    );

    for entry in &outcome.extracted {
        println!(
            "{}",
            Theme::added(&display_under(entry.root(), host.cache_dir()))
        );
    }
    for root in &outcome.evicted {
        println!("{}", Theme::removed(&display_under(root, host.cache_dir())));
    }

    if outcome.extracted.is_empty() && outcome.evicted.is_empty() {
        println!("{}", Theme::ok("Cache is up to date"));
    } else {
        println!(
            "{}",
            Theme::ok(&format!(
                "Extracted {}, evicted {}; {} plugins cached",
                outcome.extracted.len(),
                outcome.evicted.len(),
                outcome.entries.len()
            ))
        );
    }
    Ok(())
}
