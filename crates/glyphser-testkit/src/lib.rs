//! # Glyphser Testkit
//!
//! Testing utilities for Glyphser.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned encodings, domain digests and chain heads for cross-implementation verification
//! - **Generators**: Proptest strategies for canonical values, map keys and trace records
//! - **Fixtures**: Scratch trees with contracts, fixtures and goldens materialized
//!
//! ## Golden Vectors
//!
//! ```rust
//! use glyphser_testkit::vectors::verify_all_vectors;
//!
//! for result in verify_all_vectors() {
//!     println!("{}: {}", result.name, result.actual);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use glyphser_testkit::generators::shuffled_map;
//!
//! proptest! {
//!     #[test]
//!     fn map_order_is_irrelevant((a, b) in shuffled_map()) {
//!         prop_assert_eq!(glyphser_core::encode(&a)?, glyphser_core::encode(&b)?);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use glyphser_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::blessed().unwrap();
//! let outcome = glyphser::run_hello_core(&fixture.config, None).unwrap();
//! assert!(outcome.is_pass());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{memory_manifest, TestFixture};
pub use generators::{canonical_value, shuffled_map};
pub use vectors::{verify_all_vectors, VectorResult};
