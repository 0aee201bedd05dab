//! Content-hash indexes of the archive directory and the plugin cache.
//!
//! Both indexes are rebuilt from disk on every pass. Nothing about either
//! directory is remembered between passes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{PluginError, PluginResult};
use crate::identity::{ContentHash, Identity};
use crate::manifest::{MANIFEST_FILE_NAME, MetadataCodec, PluginConfig, read_metadata};

/// File extension every archive must carry (matched case-insensitively).
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Archive hashes mapped to the archive file they were computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveIndex {
    entries: BTreeMap<ContentHash, PathBuf>,
}

impl ArchiveIndex {
    /// Path of the archive with this hash.
    #[must_use]
    pub fn get(&self, hash: &ContentHash) -> Option<&Path> {
        self.entries.get(hash).map(PathBuf::as_path)
    }

    /// Whether an archive with this hash is present.
    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Iterate over `(hash, path)` pairs in hash order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, &Path)> {
        self.entries.iter().map(|(h, p)| (h, p.as_path()))
    }

    /// Number of distinct archives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, hash: ContentHash, path: PathBuf) {
        self.entries.insert(hash, path);
    }
}

/// A plugin found in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPluginEntry {
    /// Path to the plugin's `plugin.yml`.
    pub metadata_path: PathBuf,
    /// Archive hash or local digest.
    pub identity: Identity,
}

impl CachedPluginEntry {
    /// The plugin directory (parent of the metadata file).
    #[must_use]
    pub fn root(&self) -> &Path {
        self.metadata_path.parent().unwrap_or(&self.metadata_path)
    }

    /// Whether the plugin is local and exempt from eviction.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.identity.is_local()
    }
}

/// Cached plugins keyed by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIndex {
    entries: BTreeMap<Identity, PathBuf>,
    /// Non-local metadata files that were never stamped with a hash.
    pub unstamped: Vec<PathBuf>,
    /// Non-local metadata files carrying a hash another entry already claimed.
    pub redundant: Vec<PathBuf>,
}

impl CacheIndex {
    /// Metadata path of the entry with this identity.
    #[must_use]
    pub fn get(&self, identity: &Identity) -> Option<&Path> {
        self.entries.get(identity).map(PathBuf::as_path)
    }

    /// Whether an entry with this identity is present.
    #[must_use]
    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Whether an extracted plugin carries this archive hash.
    #[must_use]
    pub fn contains_archive(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(&Identity::Archived(*hash))
    }

    /// Iterate over `(identity, metadata path)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &Path)> {
        self.entries.iter().map(|(i, p)| (i, p.as_path()))
    }

    /// Live entries sorted by metadata path.
    #[must_use]
    pub fn entries(&self) -> Vec<CachedPluginEntry> {
        let mut entries: Vec<CachedPluginEntry> = self
            .entries
            .iter()
            .map(|(identity, path)| CachedPluginEntry {
                metadata_path: path.clone(),
                identity: *identity,
            })
            .collect();
        entries.sort_by(|a, b| a.metadata_path.cmp(&b.metadata_path));
        entries
    }

    /// Number of identified entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no identified entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record an entry. Used by the reconciler after extraction.
    pub(crate) fn insert(&mut self, identity: Identity, metadata_path: PathBuf) {
        self.entries.insert(identity, metadata_path);
    }

    /// Drop every entry whose metadata path is in `paths`.
    pub(crate) fn remove_paths(&mut self, paths: &BTreeSet<PathBuf>) {
        self.entries.retain(|_, path| !paths.contains(path));
        self.unstamped.retain(|path| !paths.contains(path));
        self.redundant.retain(|path| !paths.contains(path));
    }
}

/// Whether `path` has the archive extension.
#[must_use]
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Hash every archive under `dir`.
///
/// Walks `dir` recursively in sorted order. When two files have identical
/// bytes, the first path wins.
///
/// # Errors
///
/// Returns [`PluginError::Format`] for any file that is not a `.zip`, or an
/// I/O error if the tree cannot be read. No partial index is returned.
pub fn index_archives(dir: &Path) -> PluginResult<ArchiveIndex> {
    let mut index = ArchiveIndex::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if !is_archive(path) {
            return Err(PluginError::Format {
                path: path.to_path_buf(),
            });
        }

        let hash = ContentHash::hash_file(path)?;
        debug!(archive = %path.display(), hash = %hash.short_hex(12), "Indexed archive");

        if let Some(existing) = index.entries.get(&hash) {
            warn!(
                archive = %path.display(),
                duplicate_of = %existing.display(),
                "Duplicate archive content, ignoring"
            );
            continue;
        }
        index.insert(hash, path.to_path_buf());
    }

    Ok(index)
}

/// Index the plugins extracted under `dir`.
///
/// Only `plugin.yml` files at the root of a plugin directory (exactly one
/// level below `dir`) are read; every other file is ignored. Symlinked
/// plugin directories are followed.
///
/// # Errors
///
/// Returns an I/O error if the tree or a metadata file cannot be read, or
/// [`PluginError::ConfigDecode`] if a metadata file or its stamped hash is
/// malformed.
pub fn index_cache(dir: &Path, codec: &dyn MetadataCodec) -> PluginResult<CacheIndex> {
    let mut index = CacheIndex::default();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE_NAME {
            continue;
        }
        let path = entry.path();
        let (config, bytes) = read_metadata(codec, path)?;

        let Some(identity) = cache_identity(&config, &bytes, path)? else {
            warn!(metadata = %path.display(), "Cached plugin was never stamped");
            index.unstamped.push(path.to_path_buf());
            continue;
        };
        debug!(metadata = %path.display(), identity = %identity, "Indexed cached plugin");

        if let Some(existing) = index.entries.get(&identity) {
            warn!(
                metadata = %path.display(),
                duplicate_of = %existing.display(),
                identity = %identity,
                "Duplicate cached plugin"
            );
            if !identity.is_local() {
                index.redundant.push(path.to_path_buf());
            }
            continue;
        }
        index.entries.insert(identity, path.to_path_buf());
    }

    Ok(index)
}

/// Identity of a cached plugin, or `None` if it still needs a stamp.
pub(crate) fn cache_identity(
    config: &PluginConfig,
    bytes: &[u8],
    path: &Path,
) -> PluginResult<Option<Identity>> {
    if config.local {
        return Ok(Some(Identity::local(bytes)));
    }
    if config.hash.is_empty() {
        return Ok(None);
    }
    let hash = ContentHash::from_hex(&config.hash).map_err(|e| PluginError::ConfigDecode {
        path: path.to_path_buf(),
        message: format!("invalid hash `{}`: {e}", config.hash),
    })?;
    Ok(Some(Identity::Archived(hash)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::YamlCodec;

    fn write_plugin(cache: &Path, dir: &str, yaml: &str) -> PathBuf {
        let root = cache.join(dir);
        std::fs::create_dir_all(&root).unwrap();
        let path = root.join(MANIFEST_FILE_NAME);
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_is_archive() {
        assert!(is_archive(Path::new("a.zip")));
        assert!(is_archive(Path::new("dir/A.ZIP")));
        assert!(!is_archive(Path::new("a.tar.gz")));
        assert!(!is_archive(Path::new("zip")));
    }

    #[test]
    fn test_index_archives_hashes_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.zip"), b"one").unwrap();
        std::fs::create_dir_all(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/b.Zip"), b"two").unwrap();

        let index = index_archives(tmp.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get(&ContentHash::hash(b"one")),
            Some(tmp.path().join("a.zip").as_path())
        );
        assert!(index.contains(&ContentHash::hash(b"two")));
    }

    #[test]
    fn test_index_archives_rejects_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.zip"), b"one").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"hi").unwrap();

        let err = index_archives(tmp.path()).unwrap_err();
        assert!(matches!(err, PluginError::Format { path } if path.ends_with("notes.txt")));
    }

    #[test]
    fn test_index_archives_duplicate_content_first_wins() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.zip"), b"same").unwrap();
        std::fs::write(tmp.path().join("b.zip"), b"same").unwrap();

        let index = index_archives(tmp.path()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get(&ContentHash::hash(b"same")),
            Some(tmp.path().join("a.zip").as_path())
        );
    }

    #[test]
    fn test_index_archives_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let err = index_archives(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, PluginError::Io(_)));
    }

    #[test]
    fn test_index_cache_identities() {
        let tmp = tempfile::tempdir().unwrap();
        let hash = ContentHash::hash(b"archive");
        let stamped = write_plugin(
            tmp.path(),
            "hello-1",
            &format!("name: hello\ntype: greeter\nimport: x\nhash: {hash}\n"),
        );
        let local_yaml = "name: dev\ntype: greeter\nimport: y\nlocal: true\n";
        let local = write_plugin(tmp.path(), "dev", local_yaml);

        let index = index_cache(tmp.path(), &YamlCodec).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get(&Identity::Archived(hash)),
            Some(stamped.as_path())
        );
        assert_eq!(
            index.get(&Identity::local(local_yaml.as_bytes())),
            Some(local.as_path())
        );
        assert!(index.unstamped.is_empty());
    }

    #[test]
    fn test_index_cache_ignores_root_and_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(MANIFEST_FILE_NAME),
            "name: stray\ntype: t\nimport: i\nlocal: true\n",
        )
        .unwrap();
        std::fs::create_dir_all(tmp.path().join("p/vendor")).unwrap();
        std::fs::write(tmp.path().join("p/readme.md"), "# hi").unwrap();
        std::fs::write(
            tmp.path().join("p/vendor").join(MANIFEST_FILE_NAME),
            "name: nested\ntype: t\nimport: i\nlocal: true\n",
        )
        .unwrap();

        let index = index_cache(tmp.path(), &YamlCodec).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_index_cache_unstamped_and_redundant() {
        let tmp = tempfile::tempdir().unwrap();
        let hash = ContentHash::hash(b"archive");
        let yaml = format!("name: p\ntype: t\nimport: i\nhash: {hash}\n");
        let first = write_plugin(tmp.path(), "a", &yaml);
        let second = write_plugin(tmp.path(), "b", &yaml);
        let unstamped = write_plugin(tmp.path(), "c", "name: q\ntype: t\nimport: i\n");

        let index = index_cache(tmp.path(), &YamlCodec).unwrap();
        assert_eq!(index.get(&Identity::Archived(hash)), Some(first.as_path()));
        assert_eq!(index.redundant, vec![second]);
        assert_eq!(index.unstamped, vec![unstamped]);
    }

    #[cfg(unix)]
    #[test]
    fn test_index_cache_follows_symlinked_plugin_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = tmp.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        let yaml = "name: dev\ntype: greeter\nimport: y\nlocal: true\n";
        write_plugin(tmp.path(), "checkout", yaml);
        std::os::unix::fs::symlink(tmp.path().join("checkout"), cache.join("dev")).unwrap();

        let index = index_cache(&cache, &YamlCodec).unwrap();
        assert_eq!(
            index.get(&Identity::local(yaml.as_bytes())),
            Some(cache.join("dev").join(MANIFEST_FILE_NAME).as_path())
        );
    }

    #[test]
    fn test_index_cache_malformed_hash() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "a", "name: p\ntype: t\nimport: i\nhash: nothex\n");

        let err = index_cache(tmp.path(), &YamlCodec).unwrap_err();
        assert!(matches!(err, PluginError::ConfigDecode { .. }));
    }

    #[test]
    fn test_index_cache_malformed_yaml_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "a", "name: [oops");

        let err = index_cache(tmp.path(), &YamlCodec).unwrap_err();
        assert!(matches!(err, PluginError::ConfigDecode { .. }));
    }

    #[test]
    fn test_entries_sorted_by_path() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "zeta", "name: z\ntype: t\nimport: i\nlocal: true\n");
        write_plugin(tmp.path(), "alpha", "name: a\ntype: t\nimport: i\nlocal: true\n");

        let entries = index_cache(tmp.path(), &YamlCodec).unwrap().entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].metadata_path.starts_with(tmp.path().join("alpha")));
        assert!(entries[1].root().ends_with("zeta"));
        assert!(entries.iter().all(CachedPluginEntry::is_local));
    }
}
