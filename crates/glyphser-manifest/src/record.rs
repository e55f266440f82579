//! Artifact records: a name, its SHA-256 and its size.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use glyphser_core::Digest;

use crate::error::Result;

/// One declared artifact.
///
/// Serialized as `{path, sha256, size_bytes}`, the shape file-list manifests
/// use on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactRecord {
    #[serde(rename = "path")]
    pub name: String,
    pub sha256: Digest,
    pub size_bytes: u64,
}

impl ArtifactRecord {
    /// Record in-memory bytes under `name`.
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Self {
        Self {
            name: name.into(),
            sha256: Digest::of_bytes(data),
            size_bytes: data.len() as u64,
        }
    }

    /// Read and record a file.
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(Self::from_bytes(name, &data))
    }

    /// Whether `data` matches both the digest and the size.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.len() as u64 == self.size_bytes && Digest::of_bytes(data) == self.sha256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let record = ArtifactRecord::from_bytes("a.bin", b"hello world");
        assert_eq!(record.size_bytes, 11);
        assert_eq!(
            record.sha256.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(record.matches(b"hello world"));
        assert!(!record.matches(b"hello worle"));
    }

    #[test]
    fn test_json_shape() {
        let record = ArtifactRecord::from_bytes("fixtures/x.json", b"{}");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["path"], "fixtures/x.json");
        assert_eq!(json["size_bytes"], 2);
        assert_eq!(json["sha256"], record.sha256.to_hex());
    }
}
