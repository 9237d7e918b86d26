//! Reindex watermark and the store that persists it.
//!
//! A watermark records when an index was last fully walked so the next
//! reindex pass only asks the source for rows changed since then.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Last completed reindex pass for an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWatermark {
    /// Backend index name
    pub index_name: String,

    /// When the last pass finished (milliseconds since epoch in JSON)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
}

impl IndexWatermark {
    pub fn new(index_name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            index_name: index_name.into(),
            last_modified,
        }
    }

    /// Watermark stamped with the current time.
    pub fn now(index_name: impl Into<String>) -> Self {
        Self::new(index_name, Utc::now())
    }

    /// Start of the id-space walk when no watermark exists yet.
    pub fn beginning_of_time() -> DateTime<Utc> {
        DateTime::<Utc>::from(std::time::UNIX_EPOCH)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::from)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(CoreError::from)
    }
}

/// Durable storage for reindex watermarks.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Last recorded pass for the index, if any.
    async fn get_last_modified(&self, index_name: &str) -> Result<Option<DateTime<Utc>>, CoreError>;

    /// Create or overwrite the watermark.
    async fn upsert_watermark(&self, watermark: &IndexWatermark) -> Result<(), CoreError>;

    /// Forget the watermark so the next pass starts from the beginning.
    async fn delete_watermark(&self, index_name: &str) -> Result<(), CoreError>;
}
