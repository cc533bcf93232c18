//! Document store error types.
//!
//! This module defines the errors a `DocumentStore` implementation reports.
//! They describe what happened on the wire; the lifecycle components map
//! them onto `LifecycleError`.

use thiserror::Error;

/// Errors that can occur while talking to the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to reach the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store did not answer in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The addressed policy, template or stream does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The addressed resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The store answered with a non-success status.
    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// The store answered, but the body is not what this client expects.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an already exists error.
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a request failure from a status code and response body.
    pub fn request_failed(status: u16, body: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            body: body.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Whether the failure means the store could not serve the request at all.
    ///
    /// A body that arrived but could not be parsed is not an outage; retrying
    /// gets the same answer.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) => true,
            Self::RequestFailed { status, .. } => *status >= 500 || *status == 429,
            Self::NotFound(_)
            | Self::AlreadyExists(_)
            | Self::ParseError(_)
            | Self::SerializationError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unavailable() {
        assert!(StoreError::connection("refused").is_unavailable());
        assert!(StoreError::timeout("30s").is_unavailable());
        assert!(StoreError::request_failed(503, "").is_unavailable());
        assert!(StoreError::request_failed(429, "").is_unavailable());
        assert!(!StoreError::request_failed(400, "").is_unavailable());
        assert!(!StoreError::not_found("logs").is_unavailable());
        assert!(!StoreError::parse("unexpected body").is_unavailable());
    }
}
