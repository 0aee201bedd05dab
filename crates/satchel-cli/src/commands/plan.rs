//! Plan command - show what a sync would change without touching disk.

use satchel_plugins::{PluginHost, extraction_dir_name};

use super::display_under;
use crate::theme::Theme;

/// Print the pending extractions and evictions.
pub(crate) fn run(host: &PluginHost) -> anyhow::Result<()> {
    let plan = host.plan()?;

    if plan.is_empty() {
        println!("{}", Theme::ok("Cache is up to date"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Pending changes"));
    println!("{}", Theme::rule());
    for (hash, archive) in &plan.to_extract {
        println!(
            "{}",
            Theme::added(&format!(
                "{} -> {}",
                display_under(archive, host.archive_dir()),
                extraction_dir_name(archive, hash)
            ))
        );
    }
    for root in &plan.to_evict {
        println!(
            "{}",
            Theme::removed(&display_under(root, host.cache_dir()))
        );
    }
    println!(
        "\n{} to extract, {} to evict",
        plan.to_extract.len(),
        plan.to_evict.len()
    );
    Ok(())
}
