use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("external id is required")]
    EmptyExternalId,
    #[error("unknown record kind: {0}")]
    InvalidRecordKind(String),
    #[error("unknown group status: {0}")]
    InvalidGroupStatus(String),
    #[error("unknown confidence: {0}")]
    InvalidConfidence(String),
    #[error("invalid matched fields payload: {0}")]
    InvalidMatchedFields(String),
}
