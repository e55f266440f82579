//! Manifest integrity verification.
//!
//! The verifier recomputes each declared artifact's SHA-256 and size and
//! reports every difference as a [`Discrepancy`]. It never mutates the
//! manifest or the blobs, and repeated runs over the same inputs produce the
//! same report.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use glyphser_core::Digest;

use crate::manifest::Manifest;
use crate::record::ArtifactRecord;
use crate::source::BlobSource;

/// One verification finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// The artifact is declared but absent.
    MissingArtifact { artifact: String },
    /// The artifact exists but could not be read.
    UnreadableArtifact { artifact: String, reason: String },
    /// Recomputed SHA-256 differs from the declared one.
    DigestMismatch {
        artifact: String,
        expected: Digest,
        actual: Digest,
    },
    /// Actual size differs from the declared one.
    SizeMismatch {
        artifact: String,
        expected: u64,
        actual: u64,
    },
    /// A pinned identity was not produced.
    MissingIdentity { identity: String, expected: Digest },
    /// A produced identity differs from its pinned value.
    IdentityMismatch {
        identity: String,
        expected: Digest,
        actual: Digest,
    },
}

impl Discrepancy {
    /// The artifact or identity name this finding is about.
    pub fn subject(&self) -> &str {
        match self {
            Discrepancy::MissingArtifact { artifact }
            | Discrepancy::UnreadableArtifact { artifact, .. }
            | Discrepancy::DigestMismatch { artifact, .. }
            | Discrepancy::SizeMismatch { artifact, .. } => artifact,
            Discrepancy::MissingIdentity { identity, .. }
            | Discrepancy::IdentityMismatch { identity, .. } => identity,
        }
    }

    // Orders findings for the same subject.
    fn rank(&self) -> u8 {
        match self {
            Discrepancy::MissingArtifact { .. } => 0,
            Discrepancy::UnreadableArtifact { .. } => 1,
            Discrepancy::DigestMismatch { .. } => 2,
            Discrepancy::SizeMismatch { .. } => 3,
            Discrepancy::MissingIdentity { .. } => 4,
            Discrepancy::IdentityMismatch { .. } => 5,
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::MissingArtifact { artifact } => write!(f, "missing artifact: {}", artifact),
            Discrepancy::UnreadableArtifact { artifact, reason } => {
                write!(f, "unreadable artifact: {} ({})", artifact, reason)
            }
            Discrepancy::DigestMismatch {
                artifact,
                expected,
                actual,
            } => write!(
                f,
                "hash mismatch: {} expected={} got={}",
                artifact, expected, actual
            ),
            Discrepancy::SizeMismatch {
                artifact,
                expected,
                actual,
            } => write!(
                f,
                "size mismatch: {} expected={} got={}",
                artifact, expected, actual
            ),
            Discrepancy::MissingIdentity { identity, expected } => {
                write!(f, "missing identity: {} expected={}", identity, expected)
            }
            Discrepancy::IdentityMismatch {
                identity,
                expected,
                actual,
            } => write!(
                f,
                "identity mismatch: {} expected={} got={}",
                identity, expected, actual
            ),
        }
    }
}

/// Release gate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    Pass,
    Fail,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Pass => f.write_str("PASS"),
            GateStatus::Fail => f.write_str("FAIL"),
        }
    }
}

/// Outcome of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Number of artifacts or identities examined.
    pub checked: usize,
    /// Findings sorted by subject.
    pub discrepancies: Vec<Discrepancy>,
}

impl VerificationReport {
    pub fn new(checked: usize, mut discrepancies: Vec<Discrepancy>) -> Self {
        sort_discrepancies(&mut discrepancies);
        Self {
            checked,
            discrepancies,
        }
    }

    pub fn status(&self) -> GateStatus {
        if self.discrepancies.is_empty() {
            GateStatus::Pass
        } else {
            GateStatus::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status() == GateStatus::Pass
    }

    /// Combine two reports, keeping the sort order.
    pub fn merge(mut self, other: VerificationReport) -> Self {
        self.checked += other.checked;
        self.discrepancies.extend(other.discrepancies);
        sort_discrepancies(&mut self.discrepancies);
        self
    }
}

fn sort_discrepancies(discrepancies: &mut [Discrepancy]) {
    discrepancies.sort_by(|a, b| (a.subject(), a.rank()).cmp(&(b.subject(), b.rank())));
}

fn read_blob<S: BlobSource + ?Sized>(name: &str, source: &S) -> Result<Vec<u8>, Discrepancy> {
    match source.read(name) {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(Discrepancy::MissingArtifact {
            artifact: name.to_string(),
        }),
        Err(e) => Err(Discrepancy::UnreadableArtifact {
            artifact: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Check one artifact against its source.
pub fn check_artifact<S: BlobSource + ?Sized>(record: &ArtifactRecord, source: &S) -> Vec<Discrepancy> {
    let data = match read_blob(&record.name, source) {
        Ok(data) => data,
        Err(d) => return vec![d],
    };

    let mut found = Vec::new();
    let actual = Digest::of_bytes(&data);
    if actual != record.sha256 {
        found.push(Discrepancy::DigestMismatch {
            artifact: record.name.clone(),
            expected: record.sha256,
            actual,
        });
    }
    let size = data.len() as u64;
    if size != record.size_bytes {
        found.push(Discrepancy::SizeMismatch {
            artifact: record.name.clone(),
            expected: record.size_bytes,
            actual: size,
        });
    }
    debug!(artifact = %record.name, findings = found.len(), "checked artifact");
    found
}

/// Check one artifact pinned by digest alone, for manifests that carry no size.
pub fn check_digest<S: BlobSource + ?Sized>(name: &str, expected: Digest, source: &S) -> VerificationReport {
    let discrepancies = match read_blob(name, source) {
        Ok(data) => {
            let actual = Digest::of_bytes(&data);
            if actual == expected {
                Vec::new()
            } else {
                vec![Discrepancy::DigestMismatch {
                    artifact: name.to_string(),
                    expected,
                    actual,
                }]
            }
        }
        Err(d) => vec![d],
    };
    finish(1, discrepancies)
}

/// Verify every manifest entry, one after another.
pub fn verify<S: BlobSource + ?Sized>(manifest: &Manifest, source: &S) -> VerificationReport {
    let discrepancies = manifest
        .entries
        .iter()
        .flat_map(|record| check_artifact(record, source))
        .collect();
    finish(manifest.len(), discrepancies)
}

/// Verify every manifest entry, one blocking task per artifact.
///
/// The report is identical to what [`verify`] returns for the same inputs.
pub async fn verify_concurrent<S>(manifest: &Manifest, source: Arc<S>) -> VerificationReport
where
    S: BlobSource + ?Sized + 'static,
{
    let handles: Vec<_> = manifest
        .entries
        .iter()
        .cloned()
        .map(|record| {
            let source = Arc::clone(&source);
            let name = record.name.clone();
            let handle = tokio::task::spawn_blocking(move || check_artifact(&record, &*source));
            (name, handle)
        })
        .collect();

    let mut discrepancies = Vec::new();
    for (name, handle) in handles {
        match handle.await {
            Ok(found) => discrepancies.extend(found),
            Err(e) => discrepancies.push(Discrepancy::UnreadableArtifact {
                artifact: name,
                reason: format!("verification task failed: {}", e),
            }),
        }
    }
    finish(manifest.len(), discrepancies)
}

/// Compare pinned identities against produced ones.
///
/// Identities present in `actual` but not pinned in `expected` are ignored.
pub fn check_identities(
    expected: &BTreeMap<String, Digest>,
    actual: &BTreeMap<String, Digest>,
) -> VerificationReport {
    let discrepancies = expected
        .iter()
        .filter_map(|(name, want)| match actual.get(name) {
            None => Some(Discrepancy::MissingIdentity {
                identity: name.clone(),
                expected: *want,
            }),
            Some(got) if got != want => Some(Discrepancy::IdentityMismatch {
                identity: name.clone(),
                expected: *want,
                actual: *got,
            }),
            Some(_) => None,
        })
        .collect();
    finish(expected.len(), discrepancies)
}

fn finish(checked: usize, discrepancies: Vec<Discrepancy>) -> VerificationReport {
    let report = VerificationReport::new(checked, discrepancies);
    for d in &report.discrepancies {
        warn!("{}", d);
    }
    info!(
        checked = report.checked,
        discrepancies = report.discrepancies.len(),
        status = %report.status(),
        "verification finished"
    );
    report
}
