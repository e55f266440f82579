//! Operator registry with derived signature digests.
//!
//! Each entry's `signature_digest` is
//! `digest(sig, [operator_id, version, method, request_digest,
//! response_digest, side_effects, allowed_error_codes])` with both array
//! fields sorted. The registry root hash is
//! `digest(operator_registry, [schema_version, records])`.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::digest::{Digest, SchemaRef};
use crate::domain::DomainTag;
use crate::error::{CoreError, Result};
use crate::hasher;
use crate::value::CanonicalValue;

/// Current registry schema version.
pub const REGISTRY_SCHEMA_VERSION: u64 = 1;

/// Declared contract of one operator, before its signature is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSpec {
    pub operator_id: String,
    pub version: String,
    pub method: String,
    pub surface: String,
    pub request_schema: SchemaRef,
    pub response_schema: SchemaRef,
    pub side_effects: Vec<String>,
    pub allowed_error_codes: Vec<String>,
    pub purity_class: String,
    pub required_capabilities: Vec<String>,
    pub idempotent: bool,
    pub rng_usage: String,
    pub determinism_class: String,
    pub owner_team: String,
    pub deprecated: bool,
}

impl OperatorSpec {
    /// A `CALL`/`SYSCALL` operator with no side effects.
    pub fn new(
        operator_id: impl Into<String>,
        version: impl Into<String>,
        request_schema: SchemaRef,
        response_schema: SchemaRef,
    ) -> Self {
        Self {
            operator_id: operator_id.into(),
            version: version.into(),
            method: "CALL".to_string(),
            surface: "SYSCALL".to_string(),
            request_schema,
            response_schema,
            side_effects: Vec::new(),
            allowed_error_codes: Vec::new(),
            purity_class: "PURE".to_string(),
            required_capabilities: Vec::new(),
            idempotent: false,
            rng_usage: "NONE".to_string(),
            determinism_class: "DETERMINISTIC".to_string(),
            owner_team: String::new(),
            deprecated: false,
        }
    }

    pub fn side_effects<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.side_effects = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_error_codes<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_error_codes = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn required_capabilities<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn purity_class(mut self, class: impl Into<String>) -> Self {
        self.purity_class = class.into();
        self
    }

    pub fn rng_usage(mut self, usage: impl Into<String>) -> Self {
        self.rng_usage = usage.into();
        self
    }

    pub fn owner_team(mut self, team: impl Into<String>) -> Self {
        self.owner_team = team.into();
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Numeric part of a `vN` version string.
    pub fn version_number(&self) -> Result<u64> {
        self.version
            .strip_prefix('v')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| CoreError::InvalidVersion(self.version.clone()))
    }

    fn normalized(mut self) -> Self {
        self.side_effects.sort();
        self.allowed_error_codes.sort();
        self.required_capabilities.sort();
        self
    }

    fn signature_payload(&self) -> CanonicalValue {
        CanonicalValue::Array(vec![
            self.operator_id.as_str().into(),
            self.version.as_str().into(),
            self.method.as_str().into(),
            self.request_schema.digest().into(),
            self.response_schema.digest().into(),
            text_array(&self.side_effects),
            text_array(&self.allowed_error_codes),
        ])
    }
}

fn text_array(items: &[String]) -> CanonicalValue {
    CanonicalValue::Array(items.iter().map(|s| s.as_str().into()).collect())
}

/// A registry record: a normalized spec plus its signature digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorRegistryEntry {
    spec: OperatorSpec,
    signature_digest: Digest,
}

impl OperatorRegistryEntry {
    /// Sort the array fields and derive the signature digest.
    pub fn new(spec: OperatorSpec) -> Result<Self> {
        let spec = spec.normalized();
        spec.version_number()?;
        let signature_digest = hasher::digest(DomainTag::OperatorSignature, &spec.signature_payload())?;
        Ok(Self {
            spec,
            signature_digest,
        })
    }

    /// Rebuild a persisted record with its stored signature, unchecked.
    pub fn with_signature(spec: OperatorSpec, signature_digest: Digest) -> Self {
        Self {
            spec: spec.normalized(),
            signature_digest,
        }
    }

    pub fn spec(&self) -> &OperatorSpec {
        &self.spec
    }

    pub fn operator_id(&self) -> &str {
        &self.spec.operator_id
    }

    pub fn signature_digest(&self) -> Digest {
        self.signature_digest
    }

    /// Recompute the signature and compare with the stored one.
    pub fn verify_signature(&self) -> Result<()> {
        hasher::verify(
            DomainTag::OperatorSignature,
            &self.spec.signature_payload(),
            &self.signature_digest.to_hex(),
        )
        .map(|_| ())
    }

    pub fn to_value(&self) -> CanonicalValue {
        let s = &self.spec;
        CanonicalValue::map()
            .entry("operator_id", s.operator_id.as_str())
            .entry("version", s.version.as_str())
            .entry("method", s.method.as_str())
            .entry("surface", s.surface.as_str())
            .entry("request_schema_digest", &s.request_schema)
            .entry("response_schema_digest", &s.response_schema)
            .entry("side_effects", text_array(&s.side_effects))
            .entry("allowed_error_codes", text_array(&s.allowed_error_codes))
            .entry("purity_class", s.purity_class.as_str())
            .entry("required_capabilities", text_array(&s.required_capabilities))
            .entry("idempotent", s.idempotent)
            .entry("rng_usage", s.rng_usage.as_str())
            .entry("determinism_class", s.determinism_class.as_str())
            .entry("owner_team", s.owner_team.as_str())
            .entry("deprecated", s.deprecated)
            .entry("signature_digest", self.signature_digest)
            .build()
    }
}

/// Sorted set of operator records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorRegistry {
    schema_version: u64,
    records: Vec<OperatorRegistryEntry>,
}

impl OperatorRegistry {
    /// Sort records by `(operator_id, numeric version)`.
    pub fn new(schema_version: u64, records: Vec<OperatorRegistryEntry>) -> Result<Self> {
        let mut keyed = Vec::with_capacity(records.len());
        for r in records {
            let key = (r.spec.operator_id.clone(), r.spec.version_number()?);
            keyed.push((key, r));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self {
            schema_version,
            records: keyed.into_iter().map(|(_, r)| r).collect(),
        })
    }

    /// Derive a registry from specs.
    pub fn from_specs(specs: impl IntoIterator<Item = OperatorSpec>) -> Result<Self> {
        let records = specs
            .into_iter()
            .map(OperatorRegistryEntry::new)
            .collect::<Result<Vec<_>>>()?;
        Self::new(REGISTRY_SCHEMA_VERSION, records)
    }

    /// Minimal registry for a list of operator ids: `v1`, read-only,
    /// `CONTRACT_VIOLATION` as the only allowed error.
    pub fn from_operator_ids<'a>(
        operator_ids: impl IntoIterator<Item = &'a str>,
        request_schema: &SchemaRef,
        response_schema: &SchemaRef,
    ) -> Result<Self> {
        let ids: BTreeSet<&str> = operator_ids.into_iter().collect();
        Self::from_specs(ids.into_iter().map(|id| {
            OperatorSpec::new(id, "v1", request_schema.clone(), response_schema.clone())
                .side_effects(["READ_ONLY"])
                .allowed_error_codes(["CONTRACT_VIOLATION"])
        }))
    }

    pub fn schema_version(&self) -> u64 {
        self.schema_version
    }

    pub fn records(&self) -> &[OperatorRegistryEntry] {
        &self.records
    }

    pub fn lookup(&self, operator_id: &str) -> Option<&OperatorRegistryEntry> {
        self.records.iter().find(|r| r.operator_id() == operator_id)
    }

    fn records_value(&self) -> CanonicalValue {
        CanonicalValue::Array(self.records.iter().map(|r| r.to_value()).collect())
    }

    pub fn to_value(&self) -> CanonicalValue {
        CanonicalValue::map()
            .entry("registry_schema_version", self.schema_version)
            .entry("operator_records", self.records_value())
            .build()
    }

    /// `digest(operator_registry, [schema_version, records])`.
    pub fn root_hash(&self) -> Result<Digest> {
        let payload = CanonicalValue::Array(vec![self.schema_version.into(), self.records_value()]);
        hasher::digest(DomainTag::OperatorRegistry, &payload)
    }

    /// Rebuild a registry from its JSON rendering (`to_value().to_json()`).
    ///
    /// Stored signatures are kept as they are; call
    /// [`verify_signatures`](Self::verify_signatures) before trusting them.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let persisted = PersistedRegistry::deserialize(json)
            .map_err(|e| CoreError::UnsupportedValue(format!("operator registry: {}", e)))?;
        let records = persisted
            .operator_records
            .into_iter()
            .map(PersistedRecord::into_entry)
            .collect::<Result<Vec<_>>>()?;
        Self::new(persisted.registry_schema_version, records)
    }

    /// Recompute every signature digest; the first drift is returned.
    pub fn verify_signatures(&self) -> Result<()> {
        self.records.iter().try_for_each(|r| r.verify_signature())
    }
}

#[derive(Deserialize)]
struct PersistedRegistry {
    registry_schema_version: u64,
    operator_records: Vec<PersistedRecord>,
}

#[derive(Deserialize)]
struct PersistedRecord {
    operator_id: String,
    version: String,
    method: String,
    surface: String,
    request_schema_digest: SchemaRef,
    response_schema_digest: SchemaRef,
    side_effects: Vec<String>,
    allowed_error_codes: Vec<String>,
    purity_class: String,
    required_capabilities: Vec<String>,
    idempotent: bool,
    rng_usage: String,
    determinism_class: String,
    owner_team: String,
    deprecated: bool,
    signature_digest: String,
}

impl PersistedRecord {
    fn into_entry(self) -> Result<OperatorRegistryEntry> {
        // Byte strings render as `hex:<hex>` in JSON.
        let hex = self
            .signature_digest
            .strip_prefix("hex:")
            .ok_or_else(|| CoreError::InvalidDigest(self.signature_digest.clone()))?;
        let signature_digest = Digest::from_hex(hex)?;
        let spec = OperatorSpec {
            operator_id: self.operator_id,
            version: self.version,
            method: self.method,
            surface: self.surface,
            request_schema: self.request_schema_digest,
            response_schema: self.response_schema_digest,
            side_effects: self.side_effects,
            allowed_error_codes: self.allowed_error_codes,
            purity_class: self.purity_class,
            required_capabilities: self.required_capabilities,
            idempotent: self.idempotent,
            rng_usage: self.rng_usage,
            determinism_class: self.determinism_class,
            owner_team: self.owner_team,
            deprecated: self.deprecated,
        };
        Ok(OperatorRegistryEntry::with_signature(spec, signature_digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schemas() -> (SchemaRef, SchemaRef) {
        (
            SchemaRef::new("schema.request.minimal").unwrap(),
            SchemaRef::new("schema.response.minimal").unwrap(),
        )
    }

    fn next_batch(version: &str) -> OperatorSpec {
        let (req, resp) = schemas();
        OperatorSpec::new("Glyphser.Data.NextBatch", version, req, resp)
            .side_effects(["ADVANCES_RNG", "ADVANCES_CURSOR"])
            .allowed_error_codes(["CONTRACT_VIOLATION"])
            .purity_class("STATEFUL")
    }

    #[test]
    fn test_signature_ignores_array_order() {
        let a = OperatorRegistryEntry::new(next_batch("v2")).unwrap();
        let b = OperatorRegistryEntry::new(
            next_batch("v2").side_effects(["ADVANCES_CURSOR", "ADVANCES_RNG"]),
        )
        .unwrap();
        assert_eq!(a.signature_digest(), b.signature_digest());
        assert_eq!(a.spec().side_effects, vec!["ADVANCES_CURSOR", "ADVANCES_RNG"]);
    }

    #[test]
    fn test_signature_tracks_contract_fields() {
        let a = OperatorRegistryEntry::new(next_batch("v2")).unwrap();
        let b = OperatorRegistryEntry::new(next_batch("v3")).unwrap();
        assert_ne!(a.signature_digest(), b.signature_digest());
    }

    #[test]
    fn test_surface_is_outside_signature() {
        let mut spec = next_batch("v2");
        spec.surface = "LIBRARY".to_string();
        let a = OperatorRegistryEntry::new(next_batch("v2")).unwrap();
        let b = OperatorRegistryEntry::new(spec).unwrap();
        assert_eq!(a.signature_digest(), b.signature_digest());
    }

    #[test]
    fn test_records_sorted_by_numeric_version() {
        let registry = OperatorRegistry::from_specs(vec![
            next_batch("v10"),
            next_batch("v2"),
            {
                let (req, resp) = schemas();
                OperatorSpec::new("Glyphser.A", "v1", req, resp)
            },
        ])
        .unwrap();
        let order: Vec<_> = registry
            .records()
            .iter()
            .map(|r| (r.operator_id().to_string(), r.spec().version.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Glyphser.A".to_string(), "v1".to_string()),
                ("Glyphser.Data.NextBatch".to_string(), "v2".to_string()),
                ("Glyphser.Data.NextBatch".to_string(), "v10".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_version_rejected() {
        assert!(matches!(
            OperatorRegistryEntry::new(next_batch("2")),
            Err(CoreError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_root_hash_independent_of_input_order() {
        let (req, resp) = schemas();
        let a = OperatorRegistry::from_operator_ids(["B", "A"], &req, &resp).unwrap();
        let b = OperatorRegistry::from_operator_ids(["A", "B", "A"], &req, &resp).unwrap();
        assert_eq!(a.records().len(), 2);
        assert_eq!(a.root_hash().unwrap(), b.root_hash().unwrap());
    }

    #[test]
    fn test_verify_signatures_detects_drift() {
        let good = OperatorRegistryEntry::new(next_batch("v2")).unwrap();
        let forged = OperatorRegistryEntry::with_signature(next_batch("v2"), Digest::ZERO);
        let registry = OperatorRegistry::new(1, vec![good.clone()]).unwrap();
        assert!(registry.verify_signatures().is_ok());

        let registry = OperatorRegistry::new(1, vec![good, forged]).unwrap();
        assert!(matches!(
            registry.verify_signatures(),
            Err(CoreError::SignatureMismatch { domain: "sig", .. })
        ));
    }

    #[test]
    fn test_json_rendering_reloads() {
        let registry = OperatorRegistry::from_specs([next_batch("v2"), next_batch("v10")]).unwrap();
        let json = registry.to_value().to_json().unwrap();
        let signature = json["operator_records"][0]["signature_digest"].as_str().unwrap();
        assert!(signature.starts_with("hex:"));

        let reloaded = OperatorRegistry::from_json(&json).unwrap();
        assert_eq!(reloaded, registry);
        assert!(reloaded.verify_signatures().is_ok());
        assert_eq!(reloaded.root_hash().unwrap(), registry.root_hash().unwrap());

        let mut tampered = json.clone();
        tampered["operator_records"][0]["method"] = "SEND".into();
        let reloaded = OperatorRegistry::from_json(&tampered).unwrap();
        assert!(matches!(
            reloaded.verify_signatures(),
            Err(CoreError::SignatureMismatch { .. })
        ));

        let mut unprefixed = json;
        unprefixed["operator_records"][0]["signature_digest"] = "00".repeat(32).into();
        assert!(matches!(
            OperatorRegistry::from_json(&unprefixed),
            Err(CoreError::InvalidDigest(_))
        ));
    }

    #[test]
    fn test_record_value_fields() {
        let entry = OperatorRegistryEntry::new(next_batch("v2")).unwrap();
        let value = entry.to_value();
        assert_eq!(
            value.get("request_schema_digest").and_then(|v| v.as_text()),
            Some("sha256:schema.request.minimal")
        );
        assert_eq!(
            value.get("signature_digest"),
            Some(&CanonicalValue::from(entry.signature_digest()))
        );
    }
}
