//! Configuration and fixed identifiers.

use std::path::{Path, PathBuf};

pub const CONTRACTS_DIR: &str = "contracts";
pub const FIXTURES_DIR: &str = "fixtures/hello-core";
pub const GOLDENS_DIR: &str = "goldens/hello-core";
pub const VECTORS_DIR: &str = "vectors/hello-core";

pub const CATALOG_MANIFEST_FILE: &str = "catalog-manifest.json";
pub const FIXTURE_MANIFEST_FILE: &str = "fixture-manifest.json";
pub const GOLDEN_MANIFEST_FILE: &str = "golden-manifest.json";
pub const GOLDEN_IDENTITIES_FILE: &str = "golden-identities.json";
pub const VECTORS_MANIFEST_FILE: &str = "vectors-manifest.json";

pub const REGISTRY_JSON_FILE: &str = "operator_registry.json";
pub const INTERFACE_HASH_FILE: &str = "interface_hash.json";
pub const VECTORS_FILE: &str = "vectors.json";

pub const DATASET_FILE: &str = "tiny_synth_dataset.jsonl";
pub const MODEL_IR_FILE: &str = "model_ir.json";
pub const CORE_MANIFEST_FILE: &str = "manifest.core.yaml";
pub const TRACE_FILE: &str = "trace.json";
pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const CERTIFICATE_FILE: &str = "execution_certificate.json";

pub const FIXTURE_SET_ID: &str = "hello-core-fixtures-v1";
pub const GOLDEN_SET_ID: &str = "hello-core-goldens-v1";
pub const VECTORS_SET_ID: &str = "hello-core-vectors-v1";

pub const RUN_ID: &str = "hello-core-run-v1";
pub const CHECKPOINT_ID: &str = "hello-core-ckpt-v1";
pub const CERTIFICATE_ID: &str = "hello-core-cert-v1";
pub const POLICY_GATE_HASH: &str = "5a5e629c6f1bece7ef8d0b20f8ee99153f7eda4e2ec03eaa7b65db06d20fca67";

pub const NEXT_BATCH_OPERATOR: &str = "Glyphser.Data.NextBatch";
pub const EXECUTOR_OPERATOR: &str = "Glyphser.Model.ModelIR_Executor";
pub const VALIDATE_REGISTRY_OPERATOR: &str = "Glyphser.Registry.ValidateOperatorRegistry";

/// Verifier settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Check artifacts on blocking tasks instead of one after another.
    pub concurrent: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self { concurrent: true }
    }
}

/// Where a Glyphser tree lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphserConfig {
    pub root: PathBuf,
    pub contracts_dir: PathBuf,
    pub fixtures_dir: PathBuf,
    pub goldens_dir: PathBuf,
    pub vectors_dir: PathBuf,
    pub verify: VerifyConfig,
}

impl GlyphserConfig {
    /// Standard layout under `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            contracts_dir: root.join(CONTRACTS_DIR),
            fixtures_dir: root.join(FIXTURES_DIR),
            goldens_dir: root.join(GOLDENS_DIR),
            vectors_dir: root.join(VECTORS_DIR),
            root,
            verify: VerifyConfig::default(),
        }
    }

    pub fn with_verify(mut self, verify: VerifyConfig) -> Self {
        self.verify = verify;
        self
    }

    pub fn catalog_manifest_path(&self) -> PathBuf {
        self.contracts_dir.join(CATALOG_MANIFEST_FILE)
    }

    pub fn fixture_manifest_path(&self) -> PathBuf {
        self.fixtures_dir.join(FIXTURE_MANIFEST_FILE)
    }

    pub fn golden_manifest_path(&self) -> PathBuf {
        self.goldens_dir.join(GOLDEN_MANIFEST_FILE)
    }

    pub fn golden_identities_path(&self) -> PathBuf {
        self.goldens_dir.join(GOLDEN_IDENTITIES_FILE)
    }

    pub fn vectors_manifest_path(&self) -> PathBuf {
        self.vectors_dir.join(VECTORS_MANIFEST_FILE)
    }

    pub fn interface_hash_path(&self) -> PathBuf {
        self.contracts_dir.join(INTERFACE_HASH_FILE)
    }

    /// `path` relative to the root, with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for GlyphserConfig {
    fn default() -> Self {
        Self::at(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_root() {
        let config = GlyphserConfig::at("/tmp/g");
        assert_eq!(config.contracts_dir, PathBuf::from("/tmp/g/contracts"));
        assert_eq!(config.fixtures_dir, PathBuf::from("/tmp/g/fixtures/hello-core"));
        assert_eq!(
            config.catalog_manifest_path(),
            PathBuf::from("/tmp/g/contracts/catalog-manifest.json")
        );
        assert_eq!(
            config.vectors_manifest_path(),
            PathBuf::from("/tmp/g/vectors/hello-core/vectors-manifest.json")
        );
        assert!(config.verify.concurrent);
    }

    #[test]
    fn test_relative_paths_use_forward_slashes() {
        let config = GlyphserConfig::at("/tmp/g");
        let path = config.fixtures_dir.join(DATASET_FILE);
        assert_eq!(
            config.relative(&path),
            "fixtures/hello-core/tiny_synth_dataset.jsonl"
        );
    }
}
