//! Filesystem fixtures: plugin archives and pre-populated cache entries.

use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::FileOptions;

use satchel_plugins::{MANIFEST_FILE_NAME, MetadataCodec, PluginConfig, YamlCodec};

/// A scratch archive directory and cache directory that live as long as
/// the value.
#[derive(Debug)]
pub struct TestDirs {
    _root: tempfile::TempDir,
    /// Directory holding plugin archives.
    pub archives: PathBuf,
    /// Directory holding extracted plugins.
    pub cache: PathBuf,
}

impl TestDirs {
    /// Create both directories under a fresh temp dir.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directories cannot be created.
    pub fn new() -> io::Result<Self> {
        let root = tempfile::tempdir()?;
        let archives = root.path().join("plugins");
        let cache = root.path().join("plugins-cache");
        std::fs::create_dir_all(&archives)?;
        std::fs::create_dir_all(&cache)?;
        Ok(Self {
            _root: root,
            archives,
            cache,
        })
    }

    /// Path of an archive named `name.zip` in the archive directory.
    #[must_use]
    pub fn archive(&self, name: &str) -> PathBuf {
        self.archives.join(format!("{name}.zip"))
    }

    /// Names of the plugin directories currently in the cache, sorted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cache cannot be listed.
    pub fn cached_dirs(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.cache)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Clone)]
enum Entry {
    File(String, Vec<u8>),
    Dir(String),
    Symlink(String, String),
}

/// Builds plugin `.zip` archives in memory.
///
/// By default entries are placed at the archive root. Use
/// [`with_folder`](Self::with_folder) to wrap them in a single top-level
/// folder the way most published plugins are packaged.
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    folder: Option<String>,
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    /// Start an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap every entry in a top-level folder.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Add `plugin.yml` encoded from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be encoded.
    pub fn with_metadata(self, config: &PluginConfig) -> io::Result<Self> {
        let bytes = YamlCodec.encode(config).map_err(io::Error::other)?;
        Ok(self.with_file(MANIFEST_FILE_NAME, bytes))
    }

    /// Add `plugin.yml` with raw contents.
    #[must_use]
    pub fn with_metadata_yaml(self, yaml: &str) -> Self {
        self.with_file(MANIFEST_FILE_NAME, yaml.as_bytes().to_vec())
    }

    /// Add a regular file.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.entries.push(Entry::File(name.into(), contents.into()));
        self
    }

    /// Add an explicit directory entry.
    #[must_use]
    pub fn with_dir(mut self, name: impl Into<String>) -> Self {
        self.entries.push(Entry::Dir(name.into()));
        self
    }

    /// Add a symlink entry.
    #[must_use]
    pub fn with_symlink(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.entries.push(Entry::Symlink(name.into(), target.into()));
        self
    }

    /// Encode the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the zip writer fails.
    pub fn build(&self) -> io::Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        if let Some(folder) = &self.folder {
            writer
                .add_directory(format!("{folder}/"), options)
                .map_err(io::Error::other)?;
        }
        for entry in &self.entries {
            match entry {
                Entry::File(name, contents) => {
                    writer
                        .start_file(self.entry_name(name), options)
                        .map_err(io::Error::other)?;
                    writer.write_all(contents)?;
                },
                Entry::Dir(name) => {
                    writer
                        .add_directory(format!("{}/", self.entry_name(name)), options)
                        .map_err(io::Error::other)?;
                },
                Entry::Symlink(name, target) => {
                    writer
                        .add_symlink(self.entry_name(name), target.as_str(), options)
                        .map_err(io::Error::other)?;
                },
            }
        }

        let cursor = writer.finish().map_err(io::Error::other)?;
        Ok(cursor.into_inner())
    }

    /// Encode the archive and write it to `path`, returning `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_to(&self, path: &Path) -> io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.build()?)?;
        Ok(path.to_path_buf())
    }

    fn entry_name(&self, name: &str) -> String {
        match &self.folder {
            Some(folder) => format!("{folder}/{name}"),
            None => name.to_string(),
        }
    }
}

/// Write a plugin directory straight into the cache, bypassing extraction.
///
/// Returns the path of the written `plugin.yml`.
///
/// # Errors
///
/// Returns an error if the config cannot be encoded or written.
pub fn write_cached_plugin(
    cache_dir: &Path,
    dir_name: &str,
    config: &PluginConfig,
) -> io::Result<PathBuf> {
    let root = cache_dir.join(dir_name);
    std::fs::create_dir_all(&root)?;
    let path = root.join(MANIFEST_FILE_NAME);
    let bytes = YamlCodec.encode(config).map_err(io::Error::other)?;
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// Metadata for a greeter-style test plugin.
#[must_use]
pub fn test_plugin_config(name: &str, capability: &str) -> PluginConfig {
    PluginConfig::new(name, capability, format!("example.com/{name}"))
        .with_description(format!("Test plugin {name}"))
}
