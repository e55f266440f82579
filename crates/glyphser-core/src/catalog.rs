//! Contract catalogs: digests, schemas, error codes and capabilities.

use std::collections::BTreeMap;

use crate::digest::{Digest, SchemaRef};
use crate::domain::DomainTag;
use crate::error::Result;
use crate::hasher;
use crate::value::CanonicalValue;

pub const CATALOG_VERSION: u64 = 1;

/// Domain label recorded on every digest catalog entry.
pub const CATALOG_DOMAIN_LABEL: &str = "glyphser_doc_phase";

/// One labelled digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestCatalogEntry {
    pub label: String,
    pub digest: Digest,
}

impl DigestCatalogEntry {
    pub fn to_value(&self) -> CanonicalValue {
        CanonicalValue::map()
            .entry("digest_label", self.label.as_str())
            .entry("digest_value", self.digest)
            .entry("algorithm", "sha256")
            .entry("domain_tag", CATALOG_DOMAIN_LABEL)
            .build()
    }
}

/// Labels mapped to `SHA-256(label)`, kept sorted by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestCatalog {
    version: u64,
    entries: Vec<DigestCatalogEntry>,
}

impl DigestCatalog {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries: Vec<_> = labels
            .into_iter()
            .map(|label| DigestCatalogEntry {
                label: label.to_string(),
                digest: Digest::of_bytes(label.as_bytes()),
            })
            .collect();
        entries.sort_by(|a, b| a.label.cmp(&b.label));
        entries.dedup_by(|a, b| a.label == b.label);
        Self {
            version: CATALOG_VERSION,
            entries,
        }
    }

    pub fn entries(&self) -> &[DigestCatalogEntry] {
        &self.entries
    }

    pub fn lookup(&self, label: &str) -> Option<Digest> {
        self.entries
            .binary_search_by(|e| e.label.as_str().cmp(label))
            .ok()
            .map(|i| self.entries[i].digest)
    }

    /// Schema references for every label.
    pub fn schema_refs(&self) -> Result<Vec<SchemaRef>> {
        self.entries.iter().map(|e| SchemaRef::new(e.label.as_str())).collect()
    }

    fn entries_value(&self) -> CanonicalValue {
        CanonicalValue::Array(self.entries.iter().map(|e| e.to_value()).collect())
    }

    pub fn to_value(&self) -> CanonicalValue {
        CanonicalValue::map()
            .entry("catalog_version", self.version)
            .entry("entries", self.entries_value())
            .build()
    }

    /// `{schema_id, schema_digest}` per entry.
    pub fn schema_catalog_value(&self) -> CanonicalValue {
        let entries = self
            .entries
            .iter()
            .map(|e| {
                CanonicalValue::map()
                    .entry("schema_id", e.label.as_str())
                    .entry("schema_digest", e.digest)
                    .build()
            })
            .collect::<Vec<_>>();
        CanonicalValue::map()
            .entry("catalog_version", self.version)
            .entry("entries", entries)
            .build()
    }

    /// `digest(digest_catalog, [catalog_version, entries])`.
    pub fn catalog_hash(&self) -> Result<Digest> {
        let payload = CanonicalValue::Array(vec![self.version.into(), self.entries_value()]);
        hasher::digest(DomainTag::DigestCatalog, &payload)
    }
}

/// A stable error code and its severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub code_id: &'static str,
    pub severity: &'static str,
}

pub const CONTRACT_VIOLATION: &str = "CONTRACT_VIOLATION";
pub const EVIDENCE_MISSING: &str = "EVIDENCE_MISSING";
pub const SIGNATURE_MISMATCH: &str = "SIGNATURE_MISMATCH";
pub const RELEASE_BLOCKED: &str = "RELEASE_BLOCKED";
pub const CATALOG_HASH_MISMATCH: &str = "CATALOG_HASH_MISMATCH";

pub const ERROR_CODES: [ErrorCode; 5] = [
    ErrorCode { code_id: CONTRACT_VIOLATION, severity: "ERROR" },
    ErrorCode { code_id: EVIDENCE_MISSING, severity: "ERROR" },
    ErrorCode { code_id: SIGNATURE_MISMATCH, severity: "ERROR" },
    ErrorCode { code_id: RELEASE_BLOCKED, severity: "ERROR" },
    ErrorCode { code_id: CATALOG_HASH_MISMATCH, severity: "ERROR" },
];

pub const CAPABILITIES: [&str; 5] = [
    "CAP_TRACE_WRITE",
    "CAP_CHECKPOINT_WRITE",
    "CAP_CERTIFICATE_WRITE",
    "CAP_REPLAY_COMPARE",
    "CAP_REGISTRY_VALIDATE",
];

pub fn error_code_catalog_value() -> CanonicalValue {
    let entries = ERROR_CODES
        .iter()
        .map(|c| {
            CanonicalValue::map()
                .entry("code_id", c.code_id)
                .entry("severity", c.severity)
                .build()
        })
        .collect::<Vec<_>>();
    CanonicalValue::map()
        .entry("catalog_version", CATALOG_VERSION)
        .entry("entries", entries)
        .build()
}

pub fn capability_catalog_value() -> CanonicalValue {
    let capabilities = CAPABILITIES
        .iter()
        .map(|c| CanonicalValue::from(*c))
        .collect::<Vec<_>>();
    CanonicalValue::map()
        .entry("catalog_version", CATALOG_VERSION)
        .entry("capabilities", capabilities)
        .build()
}

/// A structured error report with a stable code.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub code_id: String,
    pub message: String,
    pub context: BTreeMap<String, CanonicalValue>,
}

impl ErrorRecord {
    pub fn to_value(&self) -> CanonicalValue {
        let context = CanonicalValue::map()
            .extend(self.context.iter().map(|(k, v)| (k.as_str(), v.clone())))
            .build();
        CanonicalValue::map()
            .entry("code_id", self.code_id.as_str())
            .entry("message", self.message.as_str())
            .entry("context", context)
            .build()
    }
}

/// Build an error record; context keys come out sorted.
pub fn emit_error<K, V>(
    code_id: impl Into<String>,
    message: impl Into<String>,
    context: impl IntoIterator<Item = (K, V)>,
) -> ErrorRecord
where
    K: Into<String>,
    V: Into<CanonicalValue>,
{
    ErrorRecord {
        code_id: code_id.into(),
        message: message.into(),
        context: context
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::encode;

    #[test]
    fn test_digest_catalog_sorted_and_deduplicated() {
        let catalog = DigestCatalog::from_labels(["schema.b", "schema.a", "schema.b"]);
        let labels: Vec<_> = catalog.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["schema.a", "schema.b"]);
        assert_eq!(
            catalog.lookup("schema.a"),
            Some(Digest::of_bytes(b"schema.a"))
        );
        assert_eq!(catalog.lookup("schema.c"), None);
    }

    #[test]
    fn test_catalog_hash_independent_of_label_order() {
        let a = DigestCatalog::from_labels(["x", "y", "z"]);
        let b = DigestCatalog::from_labels(["z", "x", "y"]);
        assert_eq!(a.catalog_hash().unwrap(), b.catalog_hash().unwrap());
        let c = DigestCatalog::from_labels(["x", "y"]);
        assert_ne!(a.catalog_hash().unwrap(), c.catalog_hash().unwrap());
    }

    #[test]
    fn test_catalog_values_encode() {
        assert!(encode(&error_code_catalog_value()).is_ok());
        assert!(encode(&capability_catalog_value()).is_ok());
        let catalog = DigestCatalog::from_labels(["schema.request.minimal"]);
        assert!(encode(&catalog.schema_catalog_value()).is_ok());
        assert_eq!(catalog.schema_refs().unwrap()[0].label(), "schema.request.minimal");
    }

    #[test]
    fn test_emit_error_context_order_is_irrelevant() {
        let a = emit_error(CONTRACT_VIOLATION, "bad", [("z", 1i64), ("a", 2i64)]);
        let b = emit_error(CONTRACT_VIOLATION, "bad", [("a", 2i64), ("z", 1i64)]);
        assert_eq!(a, b);
        assert_eq!(encode(&a.to_value()).unwrap(), encode(&b.to_value()).unwrap());
        let keys: Vec<_> = a.context.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "z"]);
    }
}
