use crmsweep_client::ClientError;
use crmsweep_store::error::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("crm request failed ({n} secondaries already absorbed): {source}", n = .absorbed.len())]
    External {
        /// Secondaries already merged remotely before the failure, so an
        /// operator can reconcile a partially-applied merge.
        absorbed: Vec<String>,
        #[source]
        source: ClientError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("analysis cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Store,
    NotFound,
    InvariantViolation,
    Conflict,
    External,
    Io,
    Cancelled,
}

impl EngineError {
    pub fn external(source: ClientError) -> Self {
        EngineError::External {
            absorbed: Vec::new(),
            source,
        }
    }

    pub fn kind(&self) -> EngineErrorKind {
        match self {
            EngineError::Store(_) => EngineErrorKind::Store,
            EngineError::NotFound(_) => EngineErrorKind::NotFound,
            EngineError::InvariantViolation(_) => EngineErrorKind::InvariantViolation,
            EngineError::Conflict(_) => EngineErrorKind::Conflict,
            EngineError::External { .. } => EngineErrorKind::External,
            EngineError::Io(_) => EngineErrorKind::Io,
            EngineError::Cancelled => EngineErrorKind::Cancelled,
        }
    }
}
