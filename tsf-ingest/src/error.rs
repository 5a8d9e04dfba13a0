//! Error types for tsf-ingest

use thiserror::Error;

/// Refresh pipeline error. Every variant aborts the refresh and rolls back.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Document could not be read as a catalog feed
    #[error("Malformed {feed} feed: {message}")]
    MalformedFeed { feed: &'static str, message: String },

    /// Programme references a parent row that does not exist
    #[error("Programme {programme_id} references unknown {entity} {reference}")]
    UnresolvedReference {
        programme_id: i64,
        entity: &'static str,
        reference: String,
    },

    /// Overlay row that cannot be staged
    #[error("Malformed overlay row {line} in {target} overlay: {message}")]
    MalformedOverlay {
        target: &'static str,
        line: u64,
        message: String,
    },

    /// Question bank row that cannot be loaded
    #[error("Malformed question row {line}: {message}")]
    MalformedQuestion { line: u64, message: String },

    /// Published areas without a complete base score set
    #[error("Areas of study with missing trait scores: {area_ids:?}")]
    IncompleteAreaScores { area_ids: Vec<i64> },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Common error: {0}")]
    Common(#[from] tsf_common::Error),
}

impl IngestError {
    /// Stable code for reports and logs
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::MalformedFeed { .. } => "MALFORMED_FEED",
            IngestError::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            IngestError::MalformedOverlay { .. } => "MALFORMED_OVERLAY",
            IngestError::MalformedQuestion { .. } => "MALFORMED_QUESTION",
            IngestError::IncompleteAreaScores { .. } => "INCOMPLETE_AREA_SCORES",
            IngestError::Database(_) => "DATABASE_ERROR",
            IngestError::Io(_) => "IO_ERROR",
            IngestError::Common(_) => "COMMON_ERROR",
        }
    }
}

/// Result type for pipeline stages
pub type IngestResult<T> = Result<T, IngestError>;
