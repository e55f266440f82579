//! Error types for Glyphser Core.

use thiserror::Error;

/// Errors raised by the encoder, the content hasher and the identity types.
///
/// All of these are programmer errors at steady state: they fail the call
/// immediately and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("signature mismatch in domain {domain}: expected {expected}, got {actual}")]
    SignatureMismatch {
        domain: &'static str,
        expected: String,
        actual: String,
    },

    #[error("canonical encoding mismatch: expected {expected}, got {actual}")]
    EncodingMismatch { expected: String, actual: String },

    #[error("event hash mismatch for {operator_id} at step {step}: expected {expected}, got {actual}")]
    EventHashMismatch {
        step: u64,
        operator_id: String,
        expected: String,
        actual: String,
    },

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid schema reference: {0}")]
    InvalidSchemaRef(String),

    #[error("invalid operator version: {0}")]
    InvalidVersion(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
