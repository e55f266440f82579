//! Contract and fixture materialization.
//!
//! Builds every catalog as a canonical blob, writes them under the contracts
//! directory together with a JSON rendering of the registry, the interface
//! hash and `catalog-manifest.json`. The conformance vector set and the
//! hello-core fixtures get their own manifests. Running it twice produces
//! byte-identical output.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use glyphser_core::catalog::{capability_catalog_value, error_code_catalog_value};
use glyphser_core::{
    encode, CanonicalValue, Digest, DigestCatalog, OperatorRegistry, OperatorSpec, SchemaRef,
};
use glyphser_manifest::{ArtifactWriter, CatalogManifest, FileListManifest, VectorsManifest};

use crate::config::{
    GlyphserConfig, CORE_MANIFEST_FILE, DATASET_FILE, FIXTURE_SET_ID, INTERFACE_HASH_FILE,
    MODEL_IR_FILE, NEXT_BATCH_OPERATOR, REGISTRY_JSON_FILE, VALIDATE_REGISTRY_OPERATOR,
    VECTORS_FILE, VECTORS_SET_ID,
};
use crate::conformance::TRACE_SNIPPET_FILE;
use crate::error::{GlyphserError, Result};

pub const REQUEST_SCHEMA: &str = "schema.request.minimal";
pub const RESPONSE_SCHEMA: &str = "schema.response.minimal";

pub const DIGEST_LABELS: [&str; 6] = [
    REQUEST_SCHEMA,
    RESPONSE_SCHEMA,
    "schema.trace.snippet",
    "schema.checkpoint.header",
    "schema.execution.certificate",
    "schema.vectors.catalog",
];

pub const OPERATOR_REGISTRY_ROOT_HASH: &str = "operator_registry_root_hash";
pub const DIGEST_CATALOG_HASH: &str = "digest_catalog_hash";
pub const VECTORS_CATALOG_HASH: &str = "vectors_catalog_hash";

const REGISTRY_BLOB: &str = "operator_registry.cbor";

/// Contents of `interface_hash.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceHash {
    pub interface_hash: Digest,
}

/// The two operators the hello-core contracts declare.
pub fn default_operator_specs(request: &SchemaRef, response: &SchemaRef) -> Vec<OperatorSpec> {
    vec![
        OperatorSpec::new(NEXT_BATCH_OPERATOR, "v2", request.clone(), response.clone())
            .side_effects(["ADVANCES_CURSOR", "ADVANCES_RNG"])
            .allowed_error_codes(["CONTRACT_VIOLATION"])
            .purity_class("STATEFUL")
            .required_capabilities(["CAP_TRACE_WRITE"])
            .idempotent(false)
            .rng_usage("PHILOX4x32_10")
            .owner_team("ml-core"),
        OperatorSpec::new(VALIDATE_REGISTRY_OPERATOR, "v1", request.clone(), response.clone())
            .allowed_error_codes(["CONTRACT_VIOLATION", "CATALOG_HASH_MISMATCH"])
            .purity_class("PURE")
            .required_capabilities(["CAP_REGISTRY_VALIDATE"])
            .idempotent(true)
            .owner_team("governance"),
    ]
}

fn vector(
    id: &str,
    request: &SchemaRef,
    response: &SchemaRef,
    signature: &SchemaRef,
    expected_error: Option<&str>,
    notes: &str,
) -> CanonicalValue {
    let mut builder = CanonicalValue::map()
        .entry("vector_id", id)
        .entry("input_digest", request)
        .entry("expected_output_digest", response)
        .entry("determinism_class", "E0")
        .entry("signature_digest", signature)
        .entry("notes", notes);
    if let Some(code) = expected_error {
        builder = builder.entry("expected_error_code", code);
    }
    CanonicalValue::Array(vec![builder.build()])
}

/// Conformance vectors per operator.
pub fn vectors_catalog_value(request: &SchemaRef, response: &SchemaRef) -> Result<CanonicalValue> {
    let signature = SchemaRef::new("schema.vectors.catalog")?;
    Ok(CanonicalValue::map()
        .entry("catalog_version", "v1")
        .entry(
            "operators",
            CanonicalValue::map()
                .entry(
                    NEXT_BATCH_OPERATOR,
                    vector(
                        "vector_nextbatch_001",
                        request,
                        response,
                        &signature,
                        None,
                        "minimal deterministic batch sampling fixture",
                    ),
                )
                .entry(
                    VALIDATE_REGISTRY_OPERATOR,
                    vector(
                        "vector_registry_validate_001",
                        request,
                        response,
                        &signature,
                        Some("CONTRACT_VIOLATION"),
                        "negative-path schema violation fixture",
                    ),
                )
                .build(),
        )
        .build())
}

/// Every contract catalog, built in memory.
#[derive(Debug, Clone)]
pub struct Contracts {
    pub digest_catalog: DigestCatalog,
    pub registry: OperatorRegistry,
    pub vectors_catalog: CanonicalValue,
}

impl Contracts {
    pub fn build() -> Result<Self> {
        let digest_catalog = DigestCatalog::from_labels(DIGEST_LABELS);
        let request = SchemaRef::new(REQUEST_SCHEMA)?;
        let response = SchemaRef::new(RESPONSE_SCHEMA)?;
        let registry = OperatorRegistry::from_specs(default_operator_specs(&request, &response))?;
        let vectors_catalog = vectors_catalog_value(&request, &response)?;
        Ok(Self {
            digest_catalog,
            registry,
            vectors_catalog,
        })
    }

    /// Blob name and canonical bytes for every catalog.
    pub fn blobs(&self) -> Result<Vec<(&'static str, Vec<u8>)>> {
        Ok(vec![
            ("capability_catalog.cbor", encode(&capability_catalog_value())?),
            ("digest_catalog.cbor", encode(&self.digest_catalog.to_value())?),
            ("error_codes.cbor", encode(&error_code_catalog_value())?),
            (REGISTRY_BLOB, encode(&self.registry.to_value())?),
            ("schema_catalog.cbor", encode(&self.digest_catalog.schema_catalog_value())?),
            ("vectors_catalog.cbor", encode(&self.vectors_catalog)?),
        ])
    }

    /// Plain SHA-256 of the canonical vectors catalog.
    pub fn vectors_catalog_hash(&self) -> Result<Digest> {
        Ok(Digest::of_bytes(&encode(&self.vectors_catalog)?))
    }

    /// Identities pinned in the catalog manifest.
    pub fn derived_identities(&self) -> Result<BTreeMap<String, Digest>> {
        Ok(BTreeMap::from([
            (OPERATOR_REGISTRY_ROOT_HASH.to_string(), self.registry.root_hash()?),
            (DIGEST_CATALOG_HASH.to_string(), self.digest_catalog.catalog_hash()?),
            (VECTORS_CATALOG_HASH.to_string(), self.vectors_catalog_hash()?),
        ]))
    }
}

// Root-relative `dir/file`; `dir` must not be the root itself.
fn under(config: &GlyphserConfig, dir: &Path, file: &str) -> Result<String> {
    let prefix = config.relative(dir);
    if prefix.is_empty() {
        return Err(GlyphserError::InvalidInput(format!(
            "{} must not be the root",
            dir.display()
        )));
    }
    Ok(format!("{}/{}", prefix, file))
}

/// Write the contract blobs, `operator_registry.json`, `interface_hash.json`
/// and `catalog-manifest.json`, then the conformance vector set.
pub fn materialize_contracts(config: &GlyphserConfig) -> Result<CatalogManifest> {
    let contracts = Contracts::build()?;
    contracts.registry.verify_signatures()?;

    let writer = ArtifactWriter::new(&config.contracts_dir);
    let mut manifest = CatalogManifest::new();
    for (name, blob) in contracts.blobs()? {
        manifest.insert_artifact(writer.write(name, &blob)?);
    }
    let registry_json = contracts.registry.to_value().to_json()?;
    manifest.insert_artifact(writer.write_json_pretty(REGISTRY_JSON_FILE, &registry_json)?);
    let interface = InterfaceHash {
        interface_hash: contracts.registry.root_hash()?,
    };
    manifest.insert_artifact(writer.write_json_pretty(INTERFACE_HASH_FILE, &interface)?);
    for (name, digest) in contracts.derived_identities()? {
        info!(identity = %name, digest = %digest, "derived identity");
        manifest.insert_identity(name, digest);
    }
    manifest.save(config.catalog_manifest_path())?;

    info!(
        dir = %config.contracts_dir.display(),
        artifacts = manifest.artifacts.len(),
        "materialized contracts"
    );

    materialize_vectors(config, &contracts)?;
    Ok(manifest)
}

fn vector_rows(config: &GlyphserConfig) -> serde_json::Value {
    let at = |dir: &Path, file: &str| config.relative(&dir.join(file));
    serde_json::json!({
        "vector_set_id": VECTORS_SET_ID,
        "vectors": [
            {
                "vector_id": "vector_nextbatch_001",
                "operator_id": NEXT_BATCH_OPERATOR,
                "input_ref": at(&config.fixtures_dir, DATASET_FILE),
                "expected_ref": at(&config.goldens_dir, TRACE_SNIPPET_FILE),
            },
            {
                "vector_id": "vector_registry_validate_001",
                "operator_id": VALIDATE_REGISTRY_OPERATOR,
                "input_ref": at(&config.contracts_dir, REGISTRY_BLOB),
                "expected_error_code": "CONTRACT_VIOLATION",
            },
        ],
    })
}

/// Write `vectors.json` and `vectors-manifest.json`.
///
/// The manifest pins the file by SHA-256 and the vectors catalog by its
/// canonical hash.
pub fn materialize_vectors(config: &GlyphserConfig, contracts: &Contracts) -> Result<VectorsManifest> {
    let writer = ArtifactWriter::new(&config.root);
    let record = writer.write_json_pretty(&under(config, &config.vectors_dir, VECTORS_FILE)?, &vector_rows(config))?;
    let manifest = VectorsManifest {
        vectors_catalog_hash: contracts.vectors_catalog_hash()?,
        vectors_file: record.name,
        vectors_file_sha256: record.sha256,
        vectors_set_id: VECTORS_SET_ID.to_string(),
    };
    manifest.save(config.vectors_manifest_path())?;

    info!(file = %manifest.vectors_file, "materialized vectors");
    Ok(manifest)
}

pub const DATASET_JSONL: &str = "{\"x\":[0,1,0,1],\"y\":1}\n{\"x\":[1,0,1,0],\"y\":1}\n{\"x\":[1,1,0,0],\"y\":2}\n";

pub const CORE_MANIFEST_YAML: &str = "\
run_id: hello-core-run-v1
dataset: tiny_synth_dataset.jsonl
model_ir: model_ir.json
batch_size: 1
steps: 1
";

fn model_ir() -> serde_json::Value {
    serde_json::json!({
        "ir_version": "v1",
        "graph": [
            {"node_id": "n1", "op": "MatMul", "inputs": ["x", "w"], "outputs": ["z1"]},
            {"node_id": "n2", "op": "Add", "inputs": ["z1", "b"], "outputs": ["y_hat"]},
            {"node_id": "n3", "op": "MSE", "inputs": ["y_hat", "y"], "outputs": ["loss"]},
        ],
    })
}

/// Write the hello-core inputs and `fixture-manifest.json`.
///
/// Record paths are relative to the root.
pub fn materialize_fixtures(config: &GlyphserConfig) -> Result<FileListManifest> {
    let writer = ArtifactWriter::new(&config.root);
    let path = |file: &str| under(config, &config.fixtures_dir, file);

    let files = vec![
        writer.write(&path(CORE_MANIFEST_FILE)?, CORE_MANIFEST_YAML.as_bytes())?,
        writer.write(&path(DATASET_FILE)?, DATASET_JSONL.as_bytes())?,
        writer.write_json_pretty(&path(MODEL_IR_FILE)?, &model_ir())?,
    ];
    let manifest = FileListManifest::new(FIXTURE_SET_ID, files);
    manifest.save(config.fixture_manifest_path())?;

    info!(dir = %config.fixtures_dir.display(), files = manifest.files.len(), "materialized fixtures");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_contracts_are_deterministic() {
        let a = Contracts::build().unwrap();
        let b = Contracts::build().unwrap();
        assert_eq!(a.blobs().unwrap(), b.blobs().unwrap());
        assert_eq!(a.derived_identities().unwrap(), b.derived_identities().unwrap());
    }

    #[test]
    fn test_registry_records_are_sorted_and_signed() {
        let contracts = Contracts::build().unwrap();
        let ids: Vec<_> = contracts
            .registry
            .records()
            .iter()
            .map(|r| r.operator_id())
            .collect();
        assert_eq!(ids, vec![NEXT_BATCH_OPERATOR, VALIDATE_REGISTRY_OPERATOR]);
        let validate = contracts.registry.lookup(VALIDATE_REGISTRY_OPERATOR).unwrap();
        assert_eq!(
            validate.spec().allowed_error_codes,
            vec!["CATALOG_HASH_MISMATCH", "CONTRACT_VIOLATION"]
        );
        assert!(contracts.registry.verify_signatures().is_ok());
    }

    #[test]
    fn test_materialize_twice_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let config = GlyphserConfig::at(dir.path());

        let first = materialize_contracts(&config).unwrap();
        let first_text = std::fs::read(config.catalog_manifest_path()).unwrap();
        let second = materialize_contracts(&config).unwrap();
        let second_text = std::fs::read(config.catalog_manifest_path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_text, second_text);
        assert_eq!(first.artifacts.len(), 8);
        assert!(first.derived_identities.contains_key(OPERATOR_REGISTRY_ROOT_HASH));
    }

    #[test]
    fn test_registry_json_and_interface_hash_are_written() {
        let dir = TempDir::new().unwrap();
        let config = GlyphserConfig::at(dir.path());
        let manifest = materialize_contracts(&config).unwrap();
        assert!(manifest.artifacts.contains_key(REGISTRY_JSON_FILE));
        assert!(manifest.artifacts.contains_key(INTERFACE_HASH_FILE));

        let text = std::fs::read_to_string(config.contracts_dir.join(REGISTRY_JSON_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let registry = OperatorRegistry::from_json(&json).unwrap();
        registry.verify_signatures().unwrap();
        let record = &json["operator_records"][0];
        assert_eq!(
            record["signature_digest"],
            format!("hex:{}", registry.records()[0].signature_digest().to_hex())
        );

        let root = manifest.derived_identities[OPERATOR_REGISTRY_ROOT_HASH];
        assert_eq!(registry.root_hash().unwrap(), root);
        let interface: InterfaceHash =
            glyphser_manifest::manifest::load_json(config.interface_hash_path()).unwrap();
        assert_eq!(interface.interface_hash, root);
    }

    #[test]
    fn test_vectors_manifest_pins_file_and_catalog() {
        let dir = TempDir::new().unwrap();
        let config = GlyphserConfig::at(dir.path());
        let catalog = materialize_contracts(&config).unwrap();

        let manifest = VectorsManifest::load(config.vectors_manifest_path()).unwrap();
        assert_eq!(manifest.vectors_set_id, VECTORS_SET_ID);
        assert_eq!(manifest.vectors_file, "vectors/hello-core/vectors.json");
        assert_eq!(manifest.vectors_catalog_hash, catalog.derived_identities[VECTORS_CATALOG_HASH]);

        let bytes = std::fs::read(dir.path().join(&manifest.vectors_file)).unwrap();
        assert_eq!(Digest::of_bytes(&bytes), manifest.vectors_file_sha256);
        let rows: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rows["vectors"][0]["input_ref"], "fixtures/hello-core/tiny_synth_dataset.jsonl");
        assert_eq!(rows["vectors"][1]["expected_error_code"], "CONTRACT_VIOLATION");
    }

    #[test]
    fn test_fixture_manifest_paths_are_relative() {
        let dir = TempDir::new().unwrap();
        let config = GlyphserConfig::at(dir.path());
        let manifest = materialize_fixtures(&config).unwrap();
        let paths: Vec<_> = manifest.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "fixtures/hello-core/manifest.core.yaml",
                "fixtures/hello-core/tiny_synth_dataset.jsonl",
                "fixtures/hello-core/model_ir.json",
            ]
        );
        assert_eq!(FileListManifest::load(config.fixture_manifest_path()).unwrap(), manifest);
    }
}
