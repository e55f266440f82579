//! The hello-core run.
//!
//! Takes the first dataset row, runs it through an [`Executor`], records one
//! trace record per operator invocation, chains them, and derives the
//! checkpoint and certificate identities. The identities are then compared
//! against the pinned goldens; every divergence is reported.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use glyphser_core::catalog::{CONTRACT_VIOLATION, EVIDENCE_MISSING};
use glyphser_core::{
    chain_records, emit_error, CanonicalValue, Digest, ErrorRecord, OperatorRegistry,
    SealedTraceRecord, TraceRecord,
};
use glyphser_manifest::manifest::load_json;
use glyphser_manifest::{check_identities, ArtifactWriter, CatalogManifest, Discrepancy, VerificationReport};

use crate::artifacts::{write_certificate, write_checkpoint, write_trace, CheckpointHeader, ExecutionCertificate};
use crate::config::{
    GlyphserConfig, CERTIFICATE_FILE, CHECKPOINT_FILE, CORE_MANIFEST_FILE, DATASET_FILE,
    EXECUTOR_OPERATOR, MODEL_IR_FILE, NEXT_BATCH_OPERATOR, REGISTRY_JSON_FILE, TRACE_FILE,
};
use crate::error::{GlyphserError, Result};
use crate::materialize::{InterfaceHash, OPERATOR_REGISTRY_ROOT_HASH};

pub const TRACE_FINAL_HASH: &str = "trace_final_hash";
pub const CHECKPOINT_HASH: &str = "checkpoint_hash";
pub const CERTIFICATE_HASH: &str = "certificate_hash";
pub const INTERFACE_HASH: &str = "interface_hash";

/// Model execution, supplied by the caller.
pub trait Executor {
    fn execute(&self, inputs: &[f64]) -> Vec<f64>;
}

/// `y = x * scale + bias`, element-wise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBiasExecutor {
    pub scale: f64,
    pub bias: f64,
}

impl ScaleBiasExecutor {
    /// Read optional `scale` and `bias` from a model IR document.
    pub fn from_model_ir(ir: &serde_json::Value) -> Self {
        let default = Self::default();
        Self {
            scale: ir.get("scale").and_then(|v| v.as_f64()).unwrap_or(default.scale),
            bias: ir.get("bias").and_then(|v| v.as_f64()).unwrap_or(default.bias),
        }
    }
}

impl Default for ScaleBiasExecutor {
    fn default() -> Self {
        Self { scale: 1.0, bias: 0.0 }
    }
}

impl Executor for ScaleBiasExecutor {
    fn execute(&self, inputs: &[f64]) -> Vec<f64> {
        inputs.iter().map(|x| x * self.scale + self.bias).collect()
    }
}

/// Next `batch_size` items from `cursor`; the cursor wraps to zero at the end.
pub fn next_batch<T: Clone>(dataset: &[T], cursor: usize, batch_size: usize) -> Result<(Vec<T>, usize)> {
    if batch_size == 0 {
        return Err(GlyphserError::InvalidInput("batch_size must be positive".to_string()));
    }
    if dataset.is_empty() {
        return Ok((Vec::new(), cursor));
    }
    let start = cursor.min(dataset.len());
    let end = start.saturating_add(batch_size).min(dataset.len());
    let next = if end < dataset.len() { end } else { 0 };
    Ok((dataset[start..end].to_vec(), next))
}

/// The two sealed records for one row.
pub fn build_trace(row: &CanonicalValue, executor: &dyn Executor) -> Result<Vec<SealedTraceRecord>> {
    let xs = row
        .get("x")
        .and_then(|x| x.as_array())
        .ok_or_else(|| GlyphserError::InvalidInput("dataset row has no \"x\" array".to_string()))?;
    let inputs = xs
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| GlyphserError::InvalidInput(format!("non-numeric input {:?}", v)))
        })
        .collect::<Result<Vec<_>>>()?;
    let outputs: Vec<CanonicalValue> = executor.execute(&inputs).into_iter().map(Into::into).collect();

    let records = vec![
        TraceRecord::new(1, NEXT_BATCH_OPERATOR).with_field("batch", row.clone()),
        TraceRecord::new(1, EXECUTOR_OPERATOR)
            .with_field("inputs", xs.to_vec())
            .with_field("outputs", outputs),
    ];
    Ok(records
        .into_iter()
        .map(TraceRecord::seal)
        .collect::<glyphser_core::Result<Vec<_>>>()?)
}

/// Everything a run derives, before anything is written.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub trace: Vec<SealedTraceRecord>,
    pub checkpoint: CheckpointHeader,
    pub certificate: ExecutionCertificate,
    pub identities: RunIdentities,
}

impl RunArtifacts {
    pub fn compute(
        row: &CanonicalValue,
        executor: &dyn Executor,
        manifest_hash: Digest,
        operator_registry_root_hash: Digest,
    ) -> Result<Self> {
        let trace = build_trace(row, executor)?;
        let chain = chain_records(&trace)?;
        debug!(records = chain.len(), head = %chain.head(), "chained trace");

        let checkpoint = CheckpointHeader::new(1, manifest_hash, operator_registry_root_hash);
        let checkpoint_hash = checkpoint.checkpoint_hash()?;
        let certificate =
            ExecutionCertificate::new(chain.head(), checkpoint_hash, operator_registry_root_hash)?;

        let identities = RunIdentities {
            trace_final_hash: chain.head(),
            checkpoint_hash,
            certificate_hash: certificate.certificate_hash()?,
            interface_hash: operator_registry_root_hash,
        };
        Ok(Self {
            trace,
            checkpoint,
            certificate,
            identities,
        })
    }
}

/// Identities a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentities {
    pub certificate_hash: Digest,
    pub checkpoint_hash: Digest,
    pub interface_hash: Digest,
    pub trace_final_hash: Digest,
}

impl RunIdentities {
    pub fn to_map(&self) -> BTreeMap<String, Digest> {
        BTreeMap::from([
            (CERTIFICATE_HASH.to_string(), self.certificate_hash),
            (CHECKPOINT_HASH.to_string(), self.checkpoint_hash),
            (INTERFACE_HASH.to_string(), self.interface_hash),
            (TRACE_FINAL_HASH.to_string(), self.trace_final_hash),
        ])
    }
}

/// Pinned identities, as stored in `golden-identities.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenIdentities {
    pub expected_identities: BTreeMap<String, Digest>,
}

impl GoldenIdentities {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GlyphserError::InvalidInput(format!(
                "missing golden file: {}",
                path.display()
            )));
        }
        Ok(load_json(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(glyphser_manifest::manifest::save_json_pretty(path, self)?)
    }
}

impl From<&RunIdentities> for GoldenIdentities {
    fn from(ids: &RunIdentities) -> Self {
        Self {
            expected_identities: ids.to_map(),
        }
    }
}

/// Result of a hello-core run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub identities: RunIdentities,
    pub report: VerificationReport,
    pub errors: Vec<ErrorRecord>,
}

impl RunOutcome {
    pub fn is_pass(&self) -> bool {
        self.report.is_pass()
    }
}

fn error_for(discrepancy: &Discrepancy) -> ErrorRecord {
    let code = match discrepancy {
        Discrepancy::MissingArtifact { .. } | Discrepancy::MissingIdentity { .. } => EVIDENCE_MISSING,
        _ => CONTRACT_VIOLATION,
    };
    emit_error(
        code,
        discrepancy.to_string(),
        [("subject", CanonicalValue::text(discrepancy.subject()))],
    )
}

fn load_dataset(path: &Path) -> Result<Vec<CanonicalValue>> {
    fs::read_to_string(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> Result<CanonicalValue> {
            let json: serde_json::Value = serde_json::from_str(line)?;
            Ok(CanonicalValue::try_from(json)?)
        })
        .collect()
}

/// Load the fixtures and contracts and compute the run, without writing.
pub fn compute_run(config: &GlyphserConfig, executor: Option<&dyn Executor>) -> Result<RunArtifacts> {
    let dataset = load_dataset(&config.fixtures_dir.join(DATASET_FILE))?;
    let (batch, _cursor) = next_batch(&dataset, 0, 1)?;
    let row = batch
        .first()
        .ok_or_else(|| GlyphserError::InvalidInput("empty batch".to_string()))?;

    let model_ir: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.fixtures_dir.join(MODEL_IR_FILE))?)?;
    let default_executor = ScaleBiasExecutor::from_model_ir(&model_ir);
    let executor = executor.unwrap_or(&default_executor);

    let manifest_hash = Digest::of_bytes(&fs::read(config.fixtures_dir.join(CORE_MANIFEST_FILE))?);
    let interface_hash = load_interface_hash(config)?;
    RunArtifacts::compute(row, executor, manifest_hash, interface_hash)
}

/// Read `interface_hash.json` and check it against the persisted registry
/// and the root pinned in the catalog manifest.
pub fn load_interface_hash(config: &GlyphserConfig) -> Result<Digest> {
    let InterfaceHash { interface_hash } = load_json(config.interface_hash_path())?;

    let registry_json: serde_json::Value = load_json(config.contracts_dir.join(REGISTRY_JSON_FILE))?;
    let registry = OperatorRegistry::from_json(&registry_json)?;
    registry.verify_signatures()?;
    let registry_root = registry.root_hash()?;

    let catalog = CatalogManifest::load(config.catalog_manifest_path())?;
    let pinned = *catalog
        .derived_identities
        .get(OPERATOR_REGISTRY_ROOT_HASH)
        .ok_or_else(|| {
            GlyphserError::InvalidInput(format!("catalog manifest lacks {}", OPERATOR_REGISTRY_ROOT_HASH))
        })?;

    if interface_hash != registry_root || interface_hash != pinned {
        return Err(GlyphserError::InvalidInput(format!(
            "interface hash {} does not match registry root {} (pinned {})",
            interface_hash, registry_root, pinned
        )));
    }
    debug!(interface_hash = %interface_hash, "loaded interface hash");
    Ok(interface_hash)
}

/// Compute the run, persist its trace, checkpoint and certificate, and
/// compare the identities with the pinned goldens.
pub fn run_hello_core(config: &GlyphserConfig, executor: Option<&dyn Executor>) -> Result<RunOutcome> {
    let run = compute_run(config, executor)?;

    let writer = ArtifactWriter::new(&config.fixtures_dir);
    write_trace(&writer, TRACE_FILE, &run.trace)?;
    write_checkpoint(&writer, CHECKPOINT_FILE, &run.checkpoint)?;
    write_certificate(&writer, CERTIFICATE_FILE, &run.certificate)?;

    let golden = GoldenIdentities::load(config.golden_identities_path())?;
    let report = check_identities(&golden.expected_identities, &run.identities.to_map());
    let errors = report.discrepancies.iter().map(error_for).collect();

    info!(
        trace_final_hash = %run.identities.trace_final_hash,
        certificate_hash = %run.identities.certificate_hash,
        status = %report.status(),
        "hello-core run finished"
    );
    Ok(RunOutcome {
        identities: run.identities,
        report,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> CanonicalValue {
        let xs: Vec<CanonicalValue> = [0i64, 1, 0, 1].into_iter().map(Into::into).collect();
        CanonicalValue::map().entry("x", xs).build()
    }

    #[test]
    fn test_next_batch() {
        let data = [1, 2, 3];
        assert_eq!(next_batch(&data, 0, 2).unwrap(), (vec![1, 2], 2));
        assert_eq!(next_batch(&data, 2, 2).unwrap(), (vec![3], 0));
        assert_eq!(next_batch::<i32>(&[], 5, 1).unwrap(), (vec![], 5));
        assert!(next_batch(&data, 0, 0).is_err());
    }

    #[test]
    fn test_next_batch_oversized_request_clamps() {
        let data = [1, 2, 3];
        assert_eq!(next_batch(&data, 1, usize::MAX).unwrap(), (vec![2, 3], 0));
        assert_eq!(next_batch(&data, usize::MAX, usize::MAX).unwrap(), (vec![], 0));
    }

    #[test]
    fn test_interface_hash_comes_from_persisted_contracts() {
        use crate::materialize::{materialize_contracts, materialize_fixtures};
        let dir = tempfile::TempDir::new().unwrap();
        let config = GlyphserConfig::at(dir.path());
        let catalog = materialize_contracts(&config).unwrap();
        materialize_fixtures(&config).unwrap();

        let root = catalog.derived_identities[OPERATOR_REGISTRY_ROOT_HASH];
        assert_eq!(compute_run(&config, None).unwrap().identities.interface_hash, root);

        let forged = InterfaceHash {
            interface_hash: Digest::of_bytes(b"forged"),
        };
        glyphser_manifest::manifest::save_json_pretty(config.interface_hash_path(), &forged).unwrap();
        assert!(matches!(
            compute_run(&config, None),
            Err(GlyphserError::InvalidInput(msg)) if msg.starts_with("interface hash")
        ));

        std::fs::remove_file(config.interface_hash_path()).unwrap();
        assert!(compute_run(&config, None).is_err());
    }

    #[test]
    fn test_executor_from_model_ir() {
        let ir = serde_json::json!({"scale": 2.0, "bias": 0.5});
        let executor = ScaleBiasExecutor::from_model_ir(&ir);
        assert_eq!(executor.execute(&[0.0, 1.0]), vec![0.5, 2.5]);
        let plain = ScaleBiasExecutor::from_model_ir(&serde_json::json!({"ir_version": "v1"}));
        assert_eq!(plain, ScaleBiasExecutor::default());
    }

    #[test]
    fn test_trace_final_hash_is_pinned() {
        let run = RunArtifacts::compute(
            &row(),
            &ScaleBiasExecutor::default(),
            Digest::of_bytes(b"hello world"),
            Digest::of_bytes(b"x"),
        )
        .unwrap();
        assert_eq!(
            run.identities.trace_final_hash.to_hex(),
            "909416393465905c156c2d4cf304a4a21438eb3eed577d9d73f535973b92b84a"
        );
        assert_eq!(
            run.identities.checkpoint_hash.to_hex(),
            "8e51c60a6835a988103b1540c18db707617376427a2b45da3657c6298934bcf3"
        );
        assert_eq!(
            run.identities.certificate_hash.to_hex(),
            "ddc4e776eea74e171534a80f9481c71d760a705a9cfc244bc2b6d0bdab463f36"
        );
        assert_eq!(run.trace[0].event_hash().to_hex(), "de6ed65ba207c3e493847d1b8d1c3c606666996298c4b92fdd0ab884bd7c15de");
    }

    #[test]
    fn test_executor_change_diverges() {
        let executor = ScaleBiasExecutor { scale: 2.0, bias: 0.5 };
        let run = RunArtifacts::compute(&row(), &executor, Digest::ZERO, Digest::ZERO).unwrap();
        assert_eq!(
            run.identities.trace_final_hash.to_hex(),
            "fde3c9edda908e2108c74392be50822c5acf6b686ac14fb2fd8561af2c7a9977"
        );
    }

    #[test]
    fn test_row_without_inputs_is_rejected() {
        let bad = CanonicalValue::map().entry("y", 1i64).build();
        assert!(matches!(
            build_trace(&bad, &ScaleBiasExecutor::default()),
            Err(GlyphserError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_error_records_for_discrepancies() {
        let missing = Discrepancy::MissingIdentity {
            identity: TRACE_FINAL_HASH.to_string(),
            expected: Digest::ZERO,
        };
        let record = error_for(&missing);
        assert_eq!(record.code_id, EVIDENCE_MISSING);
        assert_eq!(
            record.context.get("subject"),
            Some(&CanonicalValue::text(TRACE_FINAL_HASH))
        );
    }
}
