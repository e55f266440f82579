//! # Glyphser Core
//!
//! Pure primitives for Glyphser: canonical encoding, domain-separated content
//! hashing and trace hash chains.
//!
//! This crate contains no I/O. Every function is a pure computation over
//! immutable values and is safe to call from any thread.
//!
//! ## Key Types
//!
//! - [`CanonicalValue`] - The closed value model the encoder accepts
//! - [`Digest`] - A SHA-256 identity, always rendered as lowercase hex
//! - [`DomainTag`] - The closed set of hashing domains
//! - [`TraceChain`] - Immutable running state of a trace hash chain
//! - [`OperatorRegistry`] - Operator contracts with derived signatures
//!
//! ## Canonicalization
//!
//! Semantically equal values encode to identical bytes. See [`canonical`].

pub mod canonical;
pub mod catalog;
pub mod chain;
pub mod digest;
pub mod domain;
pub mod error;
pub mod hasher;
pub mod registry;
pub mod trace;
pub mod value;

pub use canonical::{encode, encode_hex, validate_hex};
pub use catalog::{emit_error, DigestCatalog, DigestCatalogEntry, ErrorRecord};
pub use chain::{chain, record_digest, TraceChain};
pub use digest::{Digest, SchemaRef};
pub use domain::DomainTag;
pub use error::{CoreError, Result};
pub use hasher::digest;
pub use registry::{OperatorRegistry, OperatorRegistryEntry, OperatorSpec};
pub use trace::{chain_records, SealedTraceRecord, TraceRecord};
pub use value::{CanonicalValue, MapBuilder, MapKey};
