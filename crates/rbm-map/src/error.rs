//! Error types for mapping operations.

use thiserror::Error;

/// Errors raised while preparing the mapper. Mapping itself never fails;
/// per-record problems become findings.
#[derive(Debug, Error)]
pub enum MapError {
    /// A diagnosis trigger pattern is not a valid regular expression.
    #[error("trigger {trigger} has an invalid pattern: {source}")]
    InvalidPattern {
        trigger: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, MapError>;
