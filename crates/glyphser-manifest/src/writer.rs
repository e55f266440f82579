//! Writing artifacts and recording what was written.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::record::ArtifactRecord;

/// Writes blobs under a base directory and returns their records.
///
/// Record names are the relative path given to the writer, with `/`
/// separators.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    base: PathBuf,
}

impl ArtifactWriter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Write raw bytes.
    pub fn write(&self, name: &str, data: &[u8]) -> Result<ArtifactRecord> {
        let path = self.base.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        let record = ArtifactRecord::from_bytes(name, data);
        debug!(artifact = name, size = record.size_bytes, sha256 = %record.sha256, "wrote artifact");
        Ok(record)
    }

    /// Write compact JSON followed by a newline.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<ArtifactRecord> {
        let mut text = serde_json::to_string(value)?;
        text.push('\n');
        self.write(name, text.as_bytes())
    }

    /// Write two-space indented JSON followed by a newline.
    pub fn write_json_pretty<T: Serialize>(&self, name: &str, value: &T) -> Result<ArtifactRecord> {
        let mut text = serde_json::to_string_pretty(value)?;
        text.push('\n');
        self.write(name, text.as_bytes())
    }

    /// Record an existing file without rewriting it.
    pub fn record(&self, name: &str) -> Result<ArtifactRecord> {
        ArtifactRecord::from_file(name, self.base.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents_and_records() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let record = writer.write("nested/dir/blob.bin", b"hello world").unwrap();

        assert_eq!(record.name, "nested/dir/blob.bin");
        assert_eq!(record.size_bytes, 11);
        assert_eq!(writer.record("nested/dir/blob.bin").unwrap(), record);
    }

    #[test]
    fn test_write_json_is_compact_with_newline() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let value = serde_json::json!({"b": 1, "a": [1, 2]});
        writer.write_json("x.json", &value).unwrap();
        let text = fs::read_to_string(dir.path().join("x.json")).unwrap();
        assert_eq!(text, "{\"a\":[1,2],\"b\":1}\n");
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let value = serde_json::json!({"k": "v"});
        let first = writer.write_json_pretty("p.json", &value).unwrap();
        let second = writer.write_json_pretty("p.json", &value).unwrap();
        assert_eq!(first, second);
    }
}
