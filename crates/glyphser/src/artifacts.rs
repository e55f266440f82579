//! Checkpoint headers, execution certificates and trace files.
//!
//! Each artifact is persisted as compact JSON with sorted keys and hashed
//! under its own domain. The identity is computed over the canonical value,
//! not over the JSON text.

use serde::{Deserialize, Serialize};

use glyphser_core::{hasher, CanonicalValue, Digest, DomainTag, SealedTraceRecord};
use glyphser_manifest::{ArtifactRecord, ArtifactWriter};

use crate::config::{CERTIFICATE_ID, CHECKPOINT_ID, POLICY_GATE_HASH, RUN_ID};
use crate::error::{GlyphserError, Result};

fn canonical<T: Serialize>(value: &T) -> Result<CanonicalValue> {
    Ok(CanonicalValue::try_from(serde_json::to_value(value)?)?)
}

/// Header written alongside a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointHeader {
    pub checkpoint_id: String,
    pub global_step: u64,
    pub manifest_hash: Digest,
    pub operator_registry_root_hash: Digest,
}

impl CheckpointHeader {
    pub fn new(global_step: u64, manifest_hash: Digest, operator_registry_root_hash: Digest) -> Self {
        Self {
            checkpoint_id: CHECKPOINT_ID.to_string(),
            global_step,
            manifest_hash,
            operator_registry_root_hash,
        }
    }

    pub fn to_value(&self) -> Result<CanonicalValue> {
        canonical(self)
    }

    /// `digest(checkpoint, header)`.
    pub fn checkpoint_hash(&self) -> Result<Digest> {
        Ok(hasher::digest(DomainTag::Checkpoint, &self.to_value()?)?)
    }
}

/// Evidence binding a run to its trace, checkpoint and contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCertificate {
    pub certificate_id: String,
    pub checkpoint_hash: Digest,
    pub operator_contracts_root_hash: Digest,
    pub policy_gate_hash: Digest,
    pub run_id: String,
    pub trace_final_hash: Digest,
}

impl ExecutionCertificate {
    pub fn new(
        trace_final_hash: Digest,
        checkpoint_hash: Digest,
        operator_contracts_root_hash: Digest,
    ) -> Result<Self> {
        Ok(Self {
            certificate_id: CERTIFICATE_ID.to_string(),
            checkpoint_hash,
            operator_contracts_root_hash,
            policy_gate_hash: Digest::from_hex(POLICY_GATE_HASH)?,
            run_id: RUN_ID.to_string(),
            trace_final_hash,
        })
    }

    pub fn to_value(&self) -> Result<CanonicalValue> {
        canonical(self)
    }

    /// `digest(execution_certificate, evidence)`.
    pub fn certificate_hash(&self) -> Result<Digest> {
        Ok(hasher::digest(DomainTag::ExecutionCertificate, &self.to_value()?)?)
    }
}

/// Persist a checkpoint header and return its identity.
pub fn write_checkpoint(writer: &ArtifactWriter, name: &str, header: &CheckpointHeader) -> Result<Digest> {
    writer.write_json(name, header)?;
    header.checkpoint_hash()
}

/// Persist a certificate and return its identity.
pub fn write_certificate(
    writer: &ArtifactWriter,
    name: &str,
    certificate: &ExecutionCertificate,
) -> Result<Digest> {
    writer.write_json(name, certificate)?;
    certificate.certificate_hash()
}

/// Persist sealed records as a JSON array, in order.
pub fn write_trace(
    writer: &ArtifactWriter,
    name: &str,
    records: &[SealedTraceRecord],
) -> Result<ArtifactRecord> {
    let json = records
        .iter()
        .map(|r| r.to_json())
        .collect::<glyphser_core::Result<Vec<_>>>()?;
    Ok(writer.write_json(name, &json)?)
}

/// Read a trace file back into canonical values.
pub fn read_trace(path: impl AsRef<std::path::Path>) -> Result<Vec<CanonicalValue>> {
    let text = std::fs::read_to_string(path)?;
    match serde_json::from_str(&text)? {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .map(CanonicalValue::try_from)
            .collect::<glyphser_core::Result<Vec<_>>>()?),
        _ => Err(GlyphserError::InvalidInput(
            "trace file must hold a JSON array".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header() -> CheckpointHeader {
        CheckpointHeader::new(1, Digest::of_bytes(b"hello world"), Digest::of_bytes(b"x"))
    }

    #[test]
    fn test_checkpoint_hash_is_pinned() {
        assert_eq!(
            header().checkpoint_hash().unwrap().to_hex(),
            "8e51c60a6835a988103b1540c18db707617376427a2b45da3657c6298934bcf3"
        );
    }

    #[test]
    fn test_certificate_hash_is_pinned() {
        let trace = Digest::from_hex("909416393465905c156c2d4cf304a4a21438eb3eed577d9d73f535973b92b84a").unwrap();
        let checkpoint = header().checkpoint_hash().unwrap();
        let cert = ExecutionCertificate::new(trace, checkpoint, Digest::of_bytes(b"x")).unwrap();
        assert_eq!(
            cert.certificate_hash().unwrap().to_hex(),
            "ddc4e776eea74e171534a80f9481c71d760a705a9cfc244bc2b6d0bdab463f36"
        );
    }

    #[test]
    fn test_checkpoint_written_with_sorted_keys() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let digest = write_checkpoint(&writer, "checkpoint.json", &header()).unwrap();
        assert_eq!(digest, header().checkpoint_hash().unwrap());

        let text = std::fs::read_to_string(dir.path().join("checkpoint.json")).unwrap();
        assert!(text.starts_with("{\"checkpoint_id\":\"hello-core-ckpt-v1\",\"global_step\":1,"));
        assert!(text.ends_with("}\n"));
        let back: CheckpointHeader = serde_json::from_str(&text).unwrap();
        assert_eq!(back, header());
    }

    #[test]
    fn test_checkpoint_domain_differs_from_certificate_domain() {
        let value = header().to_value().unwrap();
        let a = hasher::digest(DomainTag::Checkpoint, &value).unwrap();
        let b = hasher::digest(DomainTag::ExecutionCertificate, &value).unwrap();
        assert_ne!(a, b);
    }
}
