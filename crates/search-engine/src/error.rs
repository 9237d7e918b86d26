//! Error types for the indexing engine.

use search_backend::BackendError;
use search_types::CoreError;
use thiserror::Error;

/// Errors that can occur in engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Backend call failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Shared vocabulary or watermark store error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Caller passed something the engine cannot express
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Reindex source failed to count or fetch rows
    #[error("Source error: {0}")]
    Source(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
