use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Transient failures worth retrying: transport errors and the
    /// rate-limit / server-side status codes. Client errors other than 429
    /// will not succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http { status, .. } => {
                matches!(*status, 429 | 500 | 502 | 503 | 504)
            }
            ClientError::Network(_) => true,
            ClientError::Parse(_) | ClientError::Url(_) => false,
        }
    }
}
