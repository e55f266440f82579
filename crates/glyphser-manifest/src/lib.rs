//! # Glyphser Manifest
//!
//! Artifact manifests and the integrity verifier.
//!
//! ## Overview
//!
//! A manifest declares a set of artifacts by name, SHA-256 and size. The
//! verifier reads each artifact through a [`BlobSource`], recomputes both
//! values and reports every difference as a [`Discrepancy`]. A report with no
//! discrepancies passes the release gate.
//!
//! ## Key Types
//!
//! - [`ArtifactRecord`] - One declared artifact
//! - [`CatalogManifest`] / [`FileListManifest`] - Size-pinned on-disk layouts
//! - [`VectorsManifest`] - Digest-only pin for a conformance vector set
//! - [`Manifest`] - The normalized form the verifier consumes
//! - [`BlobSource`] - Read access to artifact bytes ([`FsBlobSource`], [`MemoryBlobSource`])
//! - [`ArtifactWriter`] - Writes blobs and returns their records
//! - [`VerificationReport`] - Sorted findings plus the gate status
//!
//! ## Usage
//!
//! ```rust,no_run
//! use glyphser_manifest::{verify, CatalogManifest, FsBlobSource, Manifest};
//!
//! let catalog = CatalogManifest::load("contracts/catalog-manifest.json").unwrap();
//! let report = verify(&Manifest::from(catalog), &FsBlobSource::new("contracts"));
//! println!("{}", report.status());
//! ```

pub mod error;
pub mod manifest;
pub mod record;
pub mod source;
pub mod verify;
pub mod writer;

pub use error::{ManifestError, Result};
pub use manifest::{CatalogManifest, FileListManifest, Manifest, PinnedDigest, VectorsManifest};
pub use record::ArtifactRecord;
pub use source::{BlobSource, FsBlobSource, MemoryBlobSource};
pub use verify::{
    check_artifact, check_digest, check_identities, verify, verify_concurrent, Discrepancy, GateStatus,
    VerificationReport,
};
pub use writer::ArtifactWriter;
