//! Release gating: verify every manifest in a Glyphser tree.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use glyphser_manifest::{
    check_digest, check_identities, verify, verify_concurrent, ArtifactWriter, CatalogManifest,
    Discrepancy, FileListManifest, FsBlobSource, Manifest, VectorsManifest, VerificationReport,
};

use crate::config::{GlyphserConfig, GOLDEN_IDENTITIES_FILE, GOLDEN_SET_ID, RUN_ID};
use crate::error::Result;
use crate::materialize::{Contracts, VECTORS_CATALOG_HASH};
use crate::run::{GoldenIdentities, RunArtifacts};

pub const TRACE_SNIPPET_FILE: &str = "trace_snippet.json";

#[derive(Serialize)]
struct TraceSnippet<'a> {
    records: Vec<SnippetRecord<'a>>,
    run_id: &'a str,
}

#[derive(Serialize)]
struct SnippetRecord<'a> {
    event_hash: String,
    operator_id: &'a str,
    step: u64,
}

/// Pin a run's identities as the goldens and write `golden-manifest.json`.
pub fn bless_goldens(config: &GlyphserConfig, run: &RunArtifacts) -> Result<FileListManifest> {
    let writer = ArtifactWriter::new(&config.root);
    let prefix = config.relative(&config.goldens_dir);
    let path = |file: &str| format!("{}/{}", prefix, file);

    let snippet = TraceSnippet {
        records: run
            .trace
            .iter()
            .map(|r| SnippetRecord {
                event_hash: r.event_hash().to_hex(),
                operator_id: &r.record().operator_id,
                step: r.record().step,
            })
            .collect(),
        run_id: RUN_ID,
    };
    let files = vec![
        writer.write_json_pretty(&path(TRACE_SNIPPET_FILE), &snippet)?,
        writer.write_json_pretty(&path("checkpoint_header.json"), &run.checkpoint)?,
        writer.write_json_pretty(&path("execution_certificate.json"), &run.certificate)?,
        writer.write_json_pretty(
            &path(GOLDEN_IDENTITIES_FILE),
            &GoldenIdentities::from(&run.identities),
        )?,
    ];
    let manifest = FileListManifest::new(GOLDEN_SET_ID, files);
    manifest.save(config.golden_manifest_path())?;
    info!(dir = %config.goldens_dir.display(), "blessed goldens");
    Ok(manifest)
}

async fn verify_with(config: &GlyphserConfig, manifest: &Manifest, base: &Path) -> VerificationReport {
    let source = Arc::new(FsBlobSource::new(base));
    if config.verify.concurrent {
        verify_concurrent(manifest, source).await
    } else {
        verify(manifest, &*source)
    }
}

fn missing_manifest(config: &GlyphserConfig, path: &Path) -> VerificationReport {
    VerificationReport::new(
        1,
        vec![Discrepancy::MissingArtifact {
            artifact: config.relative(path),
        }],
    )
}

/// Catalog entries are named relative to the contracts directory; findings
/// name them relative to the root like every other manifest.
fn rooted_catalog(config: &GlyphserConfig, catalog: CatalogManifest) -> Manifest {
    let mut manifest = Manifest::from(catalog);
    let prefix = config.relative(&config.contracts_dir);
    if !prefix.is_empty() {
        for entry in &mut manifest.entries {
            entry.name = format!("{}/{}", prefix, entry.name);
        }
    }
    manifest
}

fn verify_vectors(config: &GlyphserConfig, vectors: &VectorsManifest, contracts: &Contracts) -> Result<VerificationReport> {
    let source = FsBlobSource::new(&config.root);
    let file = check_digest(&vectors.vectors_file, vectors.vectors_file_sha256, &source);
    let pinned = BTreeMap::from([(VECTORS_CATALOG_HASH.to_string(), vectors.vectors_catalog_hash)]);
    let recomputed = BTreeMap::from([(VECTORS_CATALOG_HASH.to_string(), contracts.vectors_catalog_hash()?)]);
    Ok(file.merge(check_identities(&pinned, &recomputed)))
}

/// Verify the contracts, vectors, fixtures and goldens of a tree.
///
/// Missing manifests are findings, not errors. Derived identities pinned in
/// the catalog and vectors manifests are recomputed and compared.
pub async fn verify_all(config: &GlyphserConfig) -> Result<VerificationReport> {
    let mut report = VerificationReport::default();
    let contracts = Contracts::build()?;

    let catalog_path = config.catalog_manifest_path();
    if catalog_path.exists() {
        let catalog = CatalogManifest::load(&catalog_path)?;
        let identities = check_identities(&catalog.derived_identities, &contracts.derived_identities()?);
        let manifest = rooted_catalog(config, catalog);
        report = report
            .merge(verify_with(config, &manifest, &config.root).await)
            .merge(identities);
    } else {
        report = report.merge(missing_manifest(config, &catalog_path));
    }

    let vectors_path = config.vectors_manifest_path();
    if vectors_path.exists() {
        let vectors = VectorsManifest::load(&vectors_path)?;
        report = report.merge(verify_vectors(config, &vectors, &contracts)?);
    } else {
        report = report.merge(missing_manifest(config, &vectors_path));
    }

    for path in [config.fixture_manifest_path(), config.golden_manifest_path()] {
        if path.exists() {
            let manifest = Manifest::from(FileListManifest::load(&path)?);
            report = report.merge(verify_with(config, &manifest, &config.root).await);
        } else {
            report = report.merge(missing_manifest(config, &path));
        }
    }

    info!(checked = report.checked, status = %report.status(), "conformance verification finished");
    Ok(report)
}
