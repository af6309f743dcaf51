use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown severity code: {0:?}")]
    UnknownSeverity(String),
    #[error("unknown record type: {0:?}")]
    UnknownRecordType(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
