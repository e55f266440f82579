//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use glyphser::config::DATASET_FILE;
use glyphser::{
    bless_goldens, compute_run, materialize_contracts, materialize_fixtures, GlyphserConfig,
    Result,
};
use glyphser_manifest::{ArtifactRecord, Manifest, MemoryBlobSource};

/// A scratch tree under a temporary directory.
pub struct TestFixture {
    pub dir: TempDir,
    pub config: GlyphserConfig,
}

impl TestFixture {
    /// An empty tree.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let config = GlyphserConfig::at(dir.path());
        Ok(Self { dir, config })
    }

    /// A tree with contracts and fixtures materialized.
    pub fn materialized() -> Result<Self> {
        let fixture = Self::new()?;
        materialize_contracts(&fixture.config)?;
        materialize_fixtures(&fixture.config)?;
        Ok(fixture)
    }

    /// A materialized tree whose goldens are blessed from its own run.
    pub fn blessed() -> Result<Self> {
        let fixture = Self::materialized()?;
        let run = compute_run(&fixture.config, None)?;
        bless_goldens(&fixture.config, &run)?;
        Ok(fixture)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a root-relative name.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Replace the dataset with the given JSONL content.
    pub fn write_dataset(&self, jsonl: &str) -> Result<()> {
        fs::write(self.config.fixtures_dir.join(DATASET_FILE), jsonl)?;
        Ok(())
    }

    /// Overwrite a root-relative file.
    pub fn overwrite(&self, relative: &str, data: &[u8]) -> Result<()> {
        fs::write(self.path(relative), data)?;
        Ok(())
    }
}

/// An in-memory source holding `blobs`, and a manifest pinning each of them.
pub fn memory_manifest(blobs: &[(&str, &[u8])]) -> (Manifest, MemoryBlobSource) {
    let source = MemoryBlobSource::new();
    let entries = blobs
        .iter()
        .map(|(name, data)| {
            source.insert(*name, data.to_vec());
            ArtifactRecord::from_bytes(*name, data)
        })
        .collect();
    (Manifest::new(entries), source)
}
