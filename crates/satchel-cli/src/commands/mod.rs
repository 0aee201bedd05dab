//! Subcommand implementations.

pub(crate) mod index;
pub(crate) mod list;
pub(crate) mod plan;
pub(crate) mod sync;

use std::path::Path;

/// Render `path` relative to `base` when it lives under it.
pub(crate) fn display_under(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
