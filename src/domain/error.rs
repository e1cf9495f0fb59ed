//! Error types for bundle and extraction operations.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors surfaced by the bundling and extraction pipelines.
///
/// Per-file problems never show up here: they are counted in the
/// [`BundleStats`](crate::domain::models::BundleStats) or the
/// [`ExtractionReport`](crate::domain::models::ExtractionReport) instead.
#[derive(Error, Debug)]
pub enum BundleError {
    /// I/O error on a specific path
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured include or exclude pattern is not a valid glob
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The bundle document does not have the expected envelope
    #[error("invalid bundle format: {0}")]
    InvalidFormat(String),

    /// Configuration snapshot could not be rendered
    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BundleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;
