//! Error types for Glyphser.

use glyphser_core::CoreError;
use glyphser_manifest::ManifestError;
use thiserror::Error;

/// Errors that can occur while materializing, running or gating.
#[derive(Debug, Error)]
pub enum GlyphserError {
    /// Encoding or identity error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Manifest or artifact error.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input files or values are not what a run expects.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for Glyphser operations.
pub type Result<T> = std::result::Result<T, GlyphserError>;
