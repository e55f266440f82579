//! # Glyphser
//!
//! The unified Glyphser API: deterministic, content-addressed identities for
//! traces, checkpoints, certificates and operator contracts.
//!
//! ## Overview
//!
//! - **Materialization**: contract catalogs written as canonical blobs plus a
//!   manifest pinning their digests and derived identities; the conformance
//!   vector set gets its own digest-pinned manifest
//! - **Runs**: the hello-core run traces one batch through an executor,
//!   chains the records and certifies the result
//! - **Gating**: every manifest in a tree is re-verified and every pinned
//!   identity recomputed; any discrepancy fails the gate
//!
//! ## Usage
//!
//! ```rust,no_run
//! use glyphser::{materialize_contracts, materialize_fixtures, run_hello_core, GlyphserConfig};
//!
//! let config = GlyphserConfig::at("/srv/glyphser");
//! materialize_contracts(&config).unwrap();
//! materialize_fixtures(&config).unwrap();
//!
//! let outcome = run_hello_core(&config, None).unwrap();
//! for error in &outcome.errors {
//!     eprintln!("{}: {}", error.code_id, error.message);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `glyphser::core` - Canonical encoding, hashing, chains, registry
//! - `glyphser::manifest` - Manifests, blob sources, verifier

pub mod artifacts;
pub mod config;
pub mod conformance;
pub mod error;
pub mod materialize;
pub mod run;

pub use glyphser_core as core;
pub use glyphser_manifest as manifest;

pub use artifacts::{CheckpointHeader, ExecutionCertificate};
pub use config::{GlyphserConfig, VerifyConfig};
pub use conformance::{bless_goldens, verify_all};
pub use error::{GlyphserError, Result};
pub use materialize::{
    materialize_contracts, materialize_fixtures, materialize_vectors, Contracts, InterfaceHash,
};
pub use run::{
    compute_run, load_interface_hash, run_hello_core, Executor, GoldenIdentities, RunArtifacts,
    RunIdentities, RunOutcome, ScaleBiasExecutor,
};

pub use glyphser_core::{
    CanonicalValue, CoreError, Digest, DomainTag, MapKey, SchemaRef, TraceChain,
};
pub use glyphser_manifest::{Discrepancy, GateStatus, VerificationReport};
