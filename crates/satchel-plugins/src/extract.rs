//! Safe archive extraction with path traversal protection.
//!
//! [`ZipExtractor`] unpacks `.zip` plugin archives while guarding against:
//! - Path traversal (`../` components)
//! - Absolute paths
//! - Symlink entries
//! - Excessive file counts and extracted size (zip bomb protection)
//!
//! Extraction stages into a temporary directory next to the destination
//! and renames it into place, so a failed extraction never leaves a
//! half-populated plugin directory behind.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{PluginError, PluginResult};

/// Maximum number of entries allowed in an archive.
const MAX_ENTRY_COUNT: usize = 10_000;

/// Maximum total extracted size (500 MB).
const MAX_EXTRACTED_SIZE: u64 = 500_000_000;

/// File type bits of a unix mode.
const S_IFMT: u32 = 0o170_000;
/// Symlink file type.
const S_IFLNK: u32 = 0o120_000;

/// Unpacks a plugin archive into a directory.
pub trait Extractor: Send + Sync {
    /// Unpack `archive` so that its contents end up directly under
    /// `destination`. Any existing `destination` is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read or contains unsafe
    /// entries. `destination` is left untouched on failure.
    fn extract(&self, archive: &Path, destination: &Path) -> PluginResult<()>;
}

/// Zip archive extractor.
///
/// Plugin archives usually wrap everything in one top-level folder
/// (`plugin.zip/hello/plugin.yml`). When every entry shares the same first
/// component, that component is stripped so the metadata file lands at
/// the root of `destination`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    fn extract(&self, archive_path: &Path, destination: &Path) -> PluginResult<()> {
        let extraction_err = |message: String| PluginError::Extraction {
            archive: archive_path.to_path_buf(),
            message,
        };

        let file = std::fs::File::open(archive_path)?;
        let mut archive = ZipArchive::new(std::io::BufReader::new(file))
            .map_err(|e| extraction_err(format!("failed to read archive: {e}")))?;

        if archive.is_empty() {
            return Err(extraction_err("archive is empty".into()));
        }
        if archive.len() > MAX_ENTRY_COUNT {
            return Err(extraction_err(format!(
                "archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"
            )));
        }

        let names: Vec<PathBuf> = archive.file_names().map(PathBuf::from).collect();
        for name in &names {
            validate_entry_path(name)?;
        }
        let shared_root = shared_top_level(&names);

        let parent = destination.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(parent)?;

        let mut total_size: u64 = 0;
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| extraction_err(format!("failed to read archive entry: {e}")))?;
            let entry_path = PathBuf::from(entry.name());

            if entry
                .unix_mode()
                .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
            {
                return Err(PluginError::UnsafeEntryType {
                    entry_type: "symlink".into(),
                    path: entry_path.display().to_string(),
                });
            }

            let entry_size = entry.size();
            total_size = total_size.saturating_add(entry_size);
            if total_size > MAX_EXTRACTED_SIZE {
                return Err(extraction_err(format!(
                    "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
                )));
            }

            let relative = match &shared_root {
                Some(root) => entry_path.strip_prefix(root).unwrap_or(&entry_path),
                None => &entry_path,
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let target = staging.path().join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(dir) = target.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let mut out = std::fs::File::create(&target)?;
            std::io::copy(&mut (&mut entry).take(entry_size), &mut out)?;
        }

        if destination.exists() {
            std::fs::remove_dir_all(destination)?;
        }
        let staging_path = staging.keep();
        if let Err(e) = std::fs::rename(&staging_path, destination) {
            let _ = std::fs::remove_dir_all(&staging_path);
            return Err(e.into());
        }

        debug!(
            archive = %archive_path.display(),
            destination = %destination.display(),
            entries = names.len(),
            "Extracted plugin archive"
        );
        Ok(())
    }
}

/// Validate that an entry path has no traversal components or absolute paths.
fn validate_entry_path(path: &Path) -> PluginResult<()> {
    if path.is_absolute() {
        return Err(PluginError::PathTraversal {
            path: path.display().to_string(),
        });
    }

    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::Prefix(_) | Component::RootDir
        ) {
            return Err(PluginError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }

    Ok(())
}

/// The first path component if every entry lives beneath it.
///
/// Returns `None` when entries disagree, or when the only thing under the
/// candidate root would be the root itself (a single top-level file).
fn shared_top_level(names: &[PathBuf]) -> Option<PathBuf> {
    let first = names.first()?.components().next()?;
    let root = PathBuf::from(first.as_os_str());

    let mut has_nested = false;
    for name in names {
        let mut components = name.components();
        if components.next().map(Component::as_os_str) != Some(first.as_os_str()) {
            return None;
        }
        if components.next().is_some() {
            has_nested = true;
        }
    }

    has_nested.then_some(root)
}
