//! Blob sources: where the verifier reads artifact bytes from.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Read access to artifact bytes by name.
///
/// `Ok(None)` means the artifact is absent. Any other failure is an error and
/// is reported separately from absence.
pub trait BlobSource: Send + Sync {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>>;
}

/// Artifacts stored as files relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsBlobSource {
    base: PathBuf,
}

impl FsBlobSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl BlobSource for FsBlobSource {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.base.join(name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-memory blobs. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryBlobSource {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), data.into());
    }

    pub fn remove(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> From<[(&str, &[u8]); N]> for MemoryBlobSource {
    fn from(entries: [(&str, &[u8]); N]) -> Self {
        let source = Self::new();
        for (name, data) in entries {
            source.insert(name, data);
        }
        source
    }
}

impl BlobSource for MemoryBlobSource {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| io::Error::other(format!("lock poisoned: {}", e)))?;
        Ok(blobs.get(name).cloned())
    }
}

impl<S: BlobSource + ?Sized> BlobSource for std::sync::Arc<S> {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        (**self).read(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_source_absent_is_none() {
        let dir = TempDir::new().unwrap();
        let source = FsBlobSource::new(dir.path());
        assert_eq!(source.read("missing.bin").unwrap(), None);

        fs::write(dir.path().join("present.bin"), b"abc").unwrap();
        assert_eq!(source.read("present.bin").unwrap(), Some(b"abc".to_vec()));
    }

    #[test]
    fn test_fs_source_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let source = FsBlobSource::new(dir.path());
        assert!(source.read("sub").is_err());
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryBlobSource::from([("a", b"1".as_slice())]);
        assert_eq!(source.len(), 1);
        assert_eq!(source.read("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(source.remove("a"), Some(b"1".to_vec()));
        assert!(source.is_empty());
        assert_eq!(source.read("a").unwrap(), None);
    }
}
