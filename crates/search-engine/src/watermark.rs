//! In-memory watermark store.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use search_types::{CoreError, IndexWatermark, WatermarkStore};

/// [`WatermarkStore`] kept in process memory, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    watermarks: DashMap<String, DateTime<Utc>>,
    upserts: AtomicUsize,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of upserts received so far.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.watermarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watermarks.is_empty()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get_last_modified(&self, index_name: &str) -> Result<Option<DateTime<Utc>>, CoreError> {
        Ok(self.watermarks.get(index_name).map(|entry| *entry))
    }

    async fn upsert_watermark(&self, watermark: &IndexWatermark) -> Result<(), CoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.watermarks
            .insert(watermark.index_name.clone(), watermark.last_modified);
        Ok(())
    }

    async fn delete_watermark(&self, index_name: &str) -> Result<(), CoreError> {
        self.watermarks.remove(index_name);
        Ok(())
    }
}
