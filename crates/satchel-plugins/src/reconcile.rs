//! Diffing the archive index against the cache index, and applying the diff.
//!
//! [`plan`] is pure: it only compares two indexes. [`Reconciler::apply`]
//! performs the filesystem mutations in a fixed order: every extraction
//! first, then every eviction. A plugin directory written during a pass is
//! never evicted by that same pass.
//!
//! A pass is not transactional. If a step fails, the mutations made before
//! it stay on disk and the next pass picks up from there.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{PluginError, PluginResult};
use crate::extract::Extractor;
use crate::identity::{ContentHash, Identity};
use crate::index::{ArchiveIndex, CacheIndex, CachedPluginEntry, cache_identity};
use crate::manifest::{MANIFEST_FILE_NAME, MetadataCodec, read_metadata};

/// Hex characters of the archive hash appended to extraction directory names.
pub const DIR_HASH_LEN: usize = 12;

/// The filesystem changes needed to bring the cache in line with the archives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Archives with no extracted counterpart, keyed by hash.
    pub to_extract: BTreeMap<ContentHash, PathBuf>,
    /// Metadata paths of cached plugins whose archive is gone.
    pub to_evict: BTreeSet<PathBuf>,
}

impl ReconcilePlan {
    /// Whether the cache is already in sync.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_extract.is_empty() && self.to_evict.is_empty()
    }
}

/// Compute the extraction and eviction sets.
///
/// Local plugins are never scheduled for eviction. Unstamped and redundant
/// cache entries always are.
#[must_use]
pub fn plan(archives: &ArchiveIndex, cache: &CacheIndex) -> ReconcilePlan {
    let to_extract = archives
        .iter()
        .filter(|(hash, _)| !cache.contains_archive(hash))
        .map(|(hash, path)| (*hash, path.to_path_buf()))
        .collect();

    let mut to_evict: BTreeSet<PathBuf> = cache
        .iter()
        .filter_map(|(identity, path)| match identity {
            Identity::Archived(hash) if !archives.contains(hash) => Some(path.to_path_buf()),
            Identity::Archived(_) | Identity::Local(_) => None,
        })
        .collect();
    to_evict.extend(cache.unstamped.iter().cloned());
    to_evict.extend(cache.redundant.iter().cloned());

    ReconcilePlan {
        to_extract,
        to_evict,
    }
}

/// Name of the cache directory an archive is extracted into.
///
/// `<archive stem>-<first 12 hex chars of the hash>`, so a new version of an
/// archive never lands in the directory of the version it replaces.
#[must_use]
pub fn extraction_dir_name(archive: &Path, hash: &ContentHash) -> String {
    let stem = archive
        .file_stem()
        .map_or_else(|| "plugin".into(), |s| s.to_string_lossy());
    format!("{stem}-{}", hash.short_hex(DIR_HASH_LEN))
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Plugins extracted during this pass.
    pub extracted: Vec<CachedPluginEntry>,
    /// Plugin directories removed during this pass.
    pub evicted: Vec<PathBuf>,
    /// Live cache entries after the pass, sorted by metadata path.
    pub entries: Vec<CachedPluginEntry>,
}

/// Applies a [`ReconcilePlan`] to the cache directory.
pub struct Reconciler<'a> {
    cache_dir: &'a Path,
    extractor: &'a dyn Extractor,
    codec: &'a dyn MetadataCodec,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler for `cache_dir`.
    #[must_use]
    pub fn new(
        cache_dir: &'a Path,
        extractor: &'a dyn Extractor,
        codec: &'a dyn MetadataCodec,
    ) -> Self {
        Self {
            cache_dir,
            extractor,
            codec,
        }
    }

    /// Extract, stamp, then evict.
    ///
    /// `cache` is the index the plan was computed from; it is updated in
    /// place to describe the cache after the pass.
    ///
    /// # Errors
    ///
    /// Returns the first extraction, metadata, or I/O error. Mutations made
    /// before the failure are not rolled back.
    pub fn apply(
        &self,
        plan: &ReconcilePlan,
        mut cache: CacheIndex,
    ) -> PluginResult<ReconcileOutcome> {
        let mut rewritten = BTreeSet::new();
        let mut extracted = Vec::with_capacity(plan.to_extract.len());

        for (hash, archive) in &plan.to_extract {
            let destination = self.cache_dir.join(extraction_dir_name(archive, hash));
            self.extractor.extract(archive, &destination)?;

            let metadata_path = destination.join(MANIFEST_FILE_NAME);
            if !metadata_path.is_file() {
                return Err(PluginError::MissingMetadata {
                    path: metadata_path,
                });
            }
            let identity = self.stamp(&metadata_path, hash)?;

            info!(
                archive = %archive.display(),
                destination = %destination.display(),
                identity = %identity,
                "Extracted plugin"
            );
            cache.insert(identity, metadata_path.clone());
            rewritten.insert(metadata_path.clone());
            extracted.push(CachedPluginEntry {
                metadata_path,
                identity,
            });
        }

        let mut evicted = Vec::new();
        let mut removed = BTreeSet::new();
        for metadata_path in &plan.to_evict {
            if rewritten.contains(metadata_path) {
                debug!(
                    metadata = %metadata_path.display(),
                    "Skipping eviction of plugin rewritten this pass"
                );
                continue;
            }
            let Some(root) = self.plugin_root(metadata_path) else {
                warn!(
                    metadata = %metadata_path.display(),
                    "Refusing to evict path outside the cache directory"
                );
                continue;
            };
            if root.exists() {
                std::fs::remove_dir_all(root)?;
            }
            info!(plugin = %root.display(), "Evicted plugin");
            evicted.push(root.to_path_buf());
            removed.insert(metadata_path.clone());
        }
        cache.remove_paths(&removed);

        Ok(ReconcileOutcome {
            extracted,
            evicted,
            entries: cache.entries(),
        })
    }

    /// Write the archive hash into freshly extracted metadata, once.
    ///
    /// Returns the identity the next indexing pass will compute for the file.
    fn stamp(&self, metadata_path: &Path, hash: &ContentHash) -> PluginResult<Identity> {
        let (mut config, bytes) = read_metadata(self.codec, metadata_path)?;

        if config.needs_stamp() {
            config.hash = hash.to_hex();
            let encoded = self.codec.encode(&config)?;
            write_atomic(metadata_path, &encoded)?;
            debug!(
                metadata = %metadata_path.display(),
                hash = %hash.short_hex(DIR_HASH_LEN),
                "Stamped plugin"
            );
            return Ok(Identity::Archived(*hash));
        }

        if config.local {
            warn!(
                metadata = %metadata_path.display(),
                "Archive contains a local plugin; it is re-extracted on every pass"
            );
        } else if config.hash != hash.to_hex() {
            warn!(
                metadata = %metadata_path.display(),
                stamped = %config.hash,
                archive = %hash,
                "Archive metadata carries a foreign hash; keeping it"
            );
        }

        cache_identity(&config, &bytes, metadata_path)?.ok_or_else(|| {
            PluginError::ConfigDecode {
                path: metadata_path.to_path_buf(),
                message: "metadata has neither a hash nor the local flag".into(),
            }
        })
    }

    /// The plugin directory for a metadata path, if it lies inside the cache.
    fn plugin_root<'p>(&self, metadata_path: &'p Path) -> Option<&'p Path> {
        let root = metadata_path.parent()?;
        (root != self.cache_dir && root.starts_with(self.cache_dir)).then_some(root)
    }
}

/// Replace `path` with `contents` via a synced temp file in the same directory.
///
/// The replacement keeps the permissions of the file it replaces.
fn write_atomic(path: &Path, contents: &[u8]) -> PluginResult<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
