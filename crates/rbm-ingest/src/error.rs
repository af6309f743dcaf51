//! Error types for record loading.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal loader errors. Row-level coercion problems are not errors; they
/// surface as [`crate::LoadFinding`]s.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source file could not be opened or read.
    #[error("source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The header lacks required columns, or there is no header at all.
    #[error("schema mismatch in {path}: missing columns {}", missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    /// Polars could not parse the CSV body.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, IngestError>;
