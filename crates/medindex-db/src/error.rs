//! Document store error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Timeout-class failures are the only ones eligible for write retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if err.is_connect() {
            StoreError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Http { status: status.as_u16(), body: err.to_string() }
        } else {
            StoreError::Rejected(err.to_string())
        }
    }
}

impl From<StoreError> for medindex_common::MedindexError {
    fn from(err: StoreError) -> Self {
        medindex_common::MedindexError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_are_transient() {
        assert!(StoreError::Timeout("read".into()).is_transient());
        assert!(!StoreError::Connection("refused".into()).is_transient());
        assert!(!StoreError::Http { status: 400, body: "mapper_parsing_exception".into() }.is_transient());
        assert!(!StoreError::Rejected("bad query".into()).is_transient());
    }
}
