//! Backend error types.

use thiserror::Error;

/// Errors that can occur while talking to a search backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Index does not exist
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Document does not exist
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Script could not be applied to a stored document
    #[error("Script error: {0}")]
    Script(String),

    /// Backend rejected its configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend cannot serve requests right now
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}
