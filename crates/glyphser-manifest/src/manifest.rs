//! Persisted manifest shapes.
//!
//! Three JSON layouts exist on disk:
//!
//! - a catalog manifest, keyed by artifact name, that also pins derived
//!   identities (`artifacts` + `derived_identities`)
//! - a file-list manifest (`set_id` + `files`)
//! - a vectors manifest pinning one vector file by digest alone
//!
//! The first two normalize into [`Manifest`], which is what the verifier
//! consumes. A vectors manifest carries no size and is checked with
//! [`check_digest`](crate::verify::check_digest).
//! Struct fields are declared in key order so the JSON comes out sorted.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use glyphser_core::Digest;

use crate::error::Result;
use crate::record::ArtifactRecord;

pub const MANIFEST_VERSION: &str = "doc-artifacts-v1";
pub const CANONICAL_PROFILE: &str = "CanonicalSerialization";

/// Digest and size pinned for one catalog artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedDigest {
    pub sha256: Digest,
    pub size_bytes: u64,
}

/// Manifest for a directory of contract blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub artifacts: BTreeMap<String, PinnedDigest>,
    pub canonical_profile: String,
    #[serde(default)]
    pub derived_identities: BTreeMap<String, Digest>,
    pub manifest_version: String,
}

impl CatalogManifest {
    pub fn new() -> Self {
        Self {
            artifacts: BTreeMap::new(),
            canonical_profile: CANONICAL_PROFILE.to_string(),
            derived_identities: BTreeMap::new(),
            manifest_version: MANIFEST_VERSION.to_string(),
        }
    }

    pub fn insert_artifact(&mut self, record: ArtifactRecord) {
        self.artifacts.insert(
            record.name,
            PinnedDigest {
                sha256: record.sha256,
                size_bytes: record.size_bytes,
            },
        );
    }

    pub fn insert_identity(&mut self, name: impl Into<String>, digest: Digest) {
        self.derived_identities.insert(name.into(), digest);
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json_pretty(path, self)
    }
}

impl Default for CatalogManifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Manifest listing files by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListManifest {
    pub files: Vec<ArtifactRecord>,
    #[serde(alias = "fixture_set_id", alias = "golden_set_id")]
    pub set_id: String,
}

impl FileListManifest {
    pub fn new(set_id: impl Into<String>, files: Vec<ArtifactRecord>) -> Self {
        Self {
            files,
            set_id: set_id.into(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json_pretty(path, self)
    }
}

/// Pins a conformance vector file and the canonical hash of its catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorsManifest {
    pub vectors_catalog_hash: Digest,
    /// Path of the vector file, relative to the repository root.
    pub vectors_file: String,
    pub vectors_file_sha256: Digest,
    pub vectors_set_id: String,
}

impl VectorsManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json_pretty(path, self)
    }
}

/// The normalized form the verifier works on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ArtifactRecord>,
    pub derived_identities: BTreeMap<String, Digest>,
}

impl Manifest {
    pub fn new(entries: Vec<ArtifactRecord>) -> Self {
        Self {
            entries,
            derived_identities: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<CatalogManifest> for Manifest {
    fn from(m: CatalogManifest) -> Self {
        Self {
            entries: m
                .artifacts
                .into_iter()
                .map(|(name, pinned)| ArtifactRecord {
                    name,
                    sha256: pinned.sha256,
                    size_bytes: pinned.size_bytes,
                })
                .collect(),
            derived_identities: m.derived_identities,
        }
    }
}

impl From<FileListManifest> for Manifest {
    fn from(m: FileListManifest) -> Self {
        Self::new(m.files)
    }
}

pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Two-space indented JSON with a trailing newline. Parent directories are
/// created as needed.
pub fn save_json_pretty<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}
