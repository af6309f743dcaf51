//! Snapshot store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Store operation error. Any error during publish leaves the previous
/// snapshot current.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O error.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A table could not be encoded or decoded.
    #[error("failed to {operation} table {table}: {source}")]
    Csv {
        operation: &'static str,
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    /// The manifest could not be encoded or decoded.
    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No snapshot has been published under this root.
    #[error("no current snapshot under {root}")]
    NoSnapshot { root: PathBuf },

    /// A table's contents do not match the checksum in the manifest.
    #[error("checksum mismatch for table {table}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        table: String,
        expected: String,
        actual: String,
    },

    /// The manifest does not list a required table.
    #[error("snapshot {run_id} has no {table} table")]
    MissingTable { run_id: String, table: &'static str },

    /// The rename that publishes a snapshot failed.
    #[error("failed to swap {temp_path} into {target_path}: {source}")]
    AtomicSwapFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
