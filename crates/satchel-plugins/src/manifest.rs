//! Plugin metadata types.
//!
//! Every extracted plugin carries a `plugin.yml` at its root describing
//! the module to import, the capability type it claims to implement, and
//! its lookup name. The `hash` field is owned by the host: it is stamped
//! once with the digest of the archive the plugin came from and never
//! rewritten afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Standard plugin metadata file name.
pub const MANIFEST_FILE_NAME: &str = "plugin.yml";

/// Persisted plugin metadata.
///
/// ```yaml
/// name: hello
/// description: Greets people.
/// import: github.com/user/hello
/// type: greeter
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Module / import identifier handed to the loader.
    #[serde(default)]
    pub import: String,
    /// Capability type tag; must match a registered contract.
    #[serde(rename = "type", default)]
    pub capability_type: String,
    /// Unique lookup name.
    #[serde(default)]
    pub name: String,
    /// The plugin has no backing archive and must never be evicted.
    #[serde(default, skip_serializing_if = "is_false")]
    pub local: bool,
    /// Supplied directly by the host process. Never persisted.
    #[serde(skip)]
    pub internal: bool,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Digest of the source archive. Written once by the host; empty until then.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

impl PluginConfig {
    /// Create a config with the three required fields set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        capability_type: impl Into<String>,
        import: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            capability_type: capability_type.into(),
            import: import.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the plugin as local.
    #[must_use]
    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    /// Whether the host still has to stamp this plugin with its archive hash.
    #[must_use]
    pub fn needs_stamp(&self) -> bool {
        !self.local && self.hash.is_empty()
    }

    /// Check the fields every registered plugin needs.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ConfigDecode`] naming `path` if `name` or
    /// `type` is empty.
    pub fn validate(&self, path: &Path) -> PluginResult<()> {
        if self.name.trim().is_empty() {
            return Err(PluginError::ConfigDecode {
                path: path.to_path_buf(),
                message: "`name` must not be empty".into(),
            });
        }
        if self.capability_type.trim().is_empty() {
            return Err(PluginError::ConfigDecode {
                path: path.to_path_buf(),
                message: "`type` must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Serialization of [`PluginConfig`] to and from metadata bytes.
pub trait MetadataCodec: Send + Sync {
    /// Decode metadata bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ConfigDecode`] on malformed input.
    fn decode(&self, bytes: &[u8]) -> PluginResult<PluginConfig>;

    /// Encode metadata to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ConfigEncode`] if serialization fails.
    fn encode(&self, config: &PluginConfig) -> PluginResult<Vec<u8>>;
}

/// YAML metadata codec (the `plugin.yml` format).
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl MetadataCodec for YamlCodec {
    fn decode(&self, bytes: &[u8]) -> PluginResult<PluginConfig> {
        serde_yaml::from_slice(bytes).map_err(|e| PluginError::ConfigDecode {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }

    fn encode(&self, config: &PluginConfig) -> PluginResult<Vec<u8>> {
        serde_yaml::to_string(config)
            .map(String::into_bytes)
            .map_err(|e| PluginError::ConfigEncode(e.to_string()))
    }
}

/// Read and decode a metadata file, attaching the path to decode errors.
///
/// Returns the decoded config together with the raw bytes, which local
/// plugins hash for their identity.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// [`PluginError::ConfigDecode`] if it cannot be parsed.
pub fn read_metadata(
    codec: &dyn MetadataCodec,
    path: &Path,
) -> PluginResult<(PluginConfig, Vec<u8>)> {
    let bytes = std::fs::read(path)?;
    let config = codec.decode(&bytes).map_err(|e| match e {
        PluginError::ConfigDecode { message, .. } => PluginError::ConfigDecode {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })?;
    Ok((config, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PluginConfig {
        PluginConfig::new("hello", "greeter", "github.com/user/hello")
            .with_description("Greets people.")
    }

    #[test]
    fn test_yaml_field_names() {
        let yaml = String::from_utf8(YamlCodec.encode(&sample()).unwrap()).unwrap();
        assert!(yaml.contains("import: github.com/user/hello"));
        assert!(yaml.contains("type: greeter"));
        assert!(yaml.contains("name: hello"));
        // Defaults are omitted.
        assert!(!yaml.contains("local"));
        assert!(!yaml.contains("hash"));
        assert!(!yaml.contains("internal"));
    }

    #[test]
    fn test_decode_minimal() {
        let yaml = b"name: Plugin\ndescription: does plugin things\nimport: github.com/user/plugin\ntype: middleware\n";
        let config = YamlCodec.decode(yaml).unwrap();
        assert_eq!(config.name, "Plugin");
        assert_eq!(config.capability_type, "middleware");
        assert_eq!(config.import, "github.com/user/plugin");
        assert!(!config.local);
        assert!(config.hash.is_empty());
        assert!(config.needs_stamp());
    }

    #[test]
    fn test_internal_is_never_persisted() {
        let mut config = sample();
        config.internal = true;
        let bytes = YamlCodec.encode(&config).unwrap();
        let decoded = YamlCodec.decode(&bytes).unwrap();
        assert!(!decoded.internal);
    }

    #[test]
    fn test_internal_in_file_is_ignored() {
        let yaml = b"name: x\ntype: t\nimport: i\ninternal: true\n";
        let config = YamlCodec.decode(yaml).unwrap();
        assert!(!config.internal);
    }

    #[test]
    fn test_local_does_not_need_stamp() {
        let config = sample().with_local(true);
        assert!(!config.needs_stamp());
    }

    #[test]
    fn test_stamped_does_not_need_stamp() {
        let mut config = sample();
        config.hash = "ab".repeat(32);
        assert!(!config.needs_stamp());
        let yaml = String::from_utf8(YamlCodec.encode(&config).unwrap()).unwrap();
        assert!(yaml.contains("hash:"));
    }

    #[test]
    fn test_decode_malformed() {
        let err = YamlCodec.decode(b"name: [unterminated").unwrap_err();
        assert!(matches!(err, PluginError::ConfigDecode { .. }));
    }

    #[test]
    fn test_validate_requires_name_and_type() {
        let path = Path::new("plugin.yml");
        assert!(sample().validate(path).is_ok());
        assert!(PluginConfig::new("", "t", "i").validate(path).is_err());
        assert!(PluginConfig::new("n", " ", "i").validate(path).is_err());
    }

    #[test]
    fn test_read_metadata_attaches_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "name: [oops").unwrap();
        match read_metadata(&YamlCodec, &path).unwrap_err() {
            PluginError::ConfigDecode { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
