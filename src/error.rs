use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by nesting, ingestion and aggregation functions.
///
/// Run-level variants (`SourceNotFound`, `Io`, `Csv`, connection-level `Store`) abort a run.
/// Row-level variants are captured in [`crate::ingestion::RowOutcome::Failed`] and never
/// escalate.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The configured source file does not exist.
    #[error("source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// Underlying I/O error (e.g. permission denied while opening the source).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A flat key is not a well-formed dotted path (empty, or with an empty segment).
    #[error("malformed key '{key}': {message}")]
    MalformedKey { key: String, message: String },

    /// A dotted path tried to nest under a leaf, or to overwrite a mapping with a leaf.
    #[error("structure conflict at '{path}': segment '{segment}' {message}")]
    StructureConflict {
        path: String,
        segment: String,
        message: String,
    },

    /// Persistence or read-back failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IngestionError {
    /// Whether this error must abort the whole run rather than a single row.
    pub fn is_run_level(&self) -> bool {
        match self {
            IngestionError::SourceNotFound { .. } | IngestionError::Io(_) => true,
            IngestionError::Csv(err) => matches!(err.kind(), csv::ErrorKind::Io(_)),
            IngestionError::Store(err) => err.is_connection_level(),
            IngestionError::MalformedKey { .. } | IngestionError::StructureConflict { .. } => false,
        }
    }
}
