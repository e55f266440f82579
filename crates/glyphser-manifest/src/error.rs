//! Error types for the manifest module.

use thiserror::Error;

use glyphser_core::CoreError;

/// Errors raised while loading, writing or hashing artifacts.
///
/// Verification findings are not errors; they are reported as
/// [`crate::Discrepancy`] values.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest JSON could not be parsed or rendered.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Encoding or identity error from the core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;
