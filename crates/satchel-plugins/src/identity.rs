//! Content-hash identities for archives and cached plugins.
//!
//! Every archive is identified by the SHA-256 digest of its raw bytes.
//! Extracted plugins inherit that digest through the stamped `hash` field
//! of their metadata. Local plugins have no archive; they are identified
//! by a digest of their own metadata file and live in a separate variant
//! so they can never be confused with an archive hash.

use std::fmt;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::PluginResult;

/// Display prefix for [`Identity::Local`].
pub const LOCAL_PREFIX: &str = "local-";

/// A SHA-256 content hash (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash arbitrary data.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Hash everything a reader yields.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the reader fails.
    pub fn hash_reader(mut reader: impl Read) -> PluginResult<Self> {
        let mut hasher = Sha256::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(Self(hasher.finalize().into()))
    }

    /// Hash the contents of a file, streaming.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read.
    pub fn hash_file(path: &Path) -> PluginResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::hash_reader(std::io::BufReader::new(file))
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Encode as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// First `len` hex characters, used for directory names and log output.
    #[must_use]
    pub fn short_hex(&self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len);
        hex
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex(16))
    }
}

/// Identity of a cached plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    /// Extracted from the archive with this hash.
    Archived(ContentHash),
    /// No backing archive; digest of the plugin's metadata file.
    Local(ContentHash),
}

impl Identity {
    /// Identity for a local plugin, derived from its raw metadata bytes.
    #[must_use]
    pub fn local(metadata: &[u8]) -> Self {
        Self::Local(ContentHash::hash(metadata))
    }

    /// Whether this identity belongs to a local plugin.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// The archive hash, if this plugin came from an archive.
    #[must_use]
    pub fn archive_hash(&self) -> Option<&ContentHash> {
        match self {
            Self::Archived(hash) => Some(hash),
            Self::Local(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archived(hash) => write!(f, "{hash}"),
            Self::Local(digest) => write!(f, "{LOCAL_PREFIX}{digest}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_known_sha256() {
        let hash = ContentHash::hash(b"abc");
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hash_reader_matches_hash() {
        let data = vec![7u8; 100_000];
        let streamed = ContentHash::hash_reader(&data[..]).unwrap();
        assert_eq!(streamed, ContentHash::hash(&data));
    }

    #[test]
    fn hex_round_trip() {
        let hash = ContentHash::hash(b"plugin");
        assert_eq!(ContentHash::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(ContentHash::from_hex("abcd").is_err());
        assert!(ContentHash::from_hex("zz").is_err());
    }

    #[test]
    fn local_and_archived_never_collide() {
        let bytes = b"name: hello\n";
        let digest = ContentHash::hash(bytes);
        assert_ne!(Identity::Archived(digest), Identity::local(bytes));
    }

    #[test]
    fn local_display_is_prefixed() {
        let id = Identity::local(b"name: hello\n");
        assert!(id.to_string().starts_with(LOCAL_PREFIX));
        assert!(id.is_local());
        assert!(id.archive_hash().is_none());
    }

    #[test]
    fn short_hex_truncates() {
        let hash = ContentHash::hash(b"abc");
        assert_eq!(hash.short_hex(12), "ba7816bf8f01");
    }
}
