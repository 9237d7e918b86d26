//! RocksDB wrapper for reindex watermarks.
//!
//! Provides:
//! - Database open with column family setup
//! - Watermark get/put/delete by index name
//! - Listing every stored watermark
//! - The async [`WatermarkStore`] contract used by the engine

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{Direction, IteratorMode, Options, DB};
use tracing::{debug, info};

use search_types::{CoreError, IndexWatermark, WatermarkStore};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_WATERMARKS};
use crate::error::StorageError;
use crate::keys::WatermarkKey;

/// Durable watermark storage
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening watermark storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn watermarks_cf(&self) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(CF_WATERMARKS)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(CF_WATERMARKS.to_string()))
    }

    /// Store (create or overwrite) a watermark
    pub fn put_watermark(&self, watermark: &IndexWatermark) -> Result<(), StorageError> {
        let cf = self.watermarks_cf()?;
        let key = WatermarkKey::new(&watermark.index_name);
        self.db.put_cf(cf, key.to_bytes(), watermark.to_bytes()?)?;
        debug!(
            index = %watermark.index_name,
            last_modified = %watermark.last_modified,
            "Stored watermark"
        );
        Ok(())
    }

    /// Get the watermark of an index
    pub fn get_watermark(&self, index_name: &str) -> Result<Option<IndexWatermark>, StorageError> {
        let cf = self.watermarks_cf()?;
        let key = WatermarkKey::new(index_name);
        match self.db.get_cf(cf, key.to_bytes())? {
            Some(bytes) => Ok(Some(IndexWatermark::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete the watermark of an index (no-op if absent)
    pub fn delete_watermark(&self, index_name: &str) -> Result<(), StorageError> {
        let cf = self.watermarks_cf()?;
        self.db.delete_cf(cf, WatermarkKey::new(index_name).to_bytes())?;
        debug!(index = %index_name, "Deleted watermark");
        Ok(())
    }

    /// All stored watermarks, ordered by index name
    pub fn list_watermarks(&self) -> Result<Vec<IndexWatermark>, StorageError> {
        let cf = self.watermarks_cf()?;
        let prefix = WatermarkKey::prefix();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        let mut results = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            WatermarkKey::from_bytes(&key)?;
            results.push(IndexWatermark::from_bytes(&value)?);
        }
        Ok(results)
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WatermarkStore for Storage {
    async fn get_last_modified(&self, index_name: &str) -> Result<Option<DateTime<Utc>>, CoreError> {
        Ok(self.get_watermark(index_name)?.map(|w| w.last_modified))
    }

    async fn upsert_watermark(&self, watermark: &IndexWatermark) -> Result<(), CoreError> {
        self.put_watermark(watermark)?;
        Ok(())
    }

    async fn delete_watermark(&self, index_name: &str) -> Result<(), CoreError> {
        Storage::delete_watermark(self, index_name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_open_creates_column_families() {
        let (storage, _temp) = create_test_storage();
        for cf_name in ALL_CF_NAMES {
            assert!(
                storage.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
    }

    #[test]
    fn test_watermark_roundtrip() {
        let (storage, _temp) = create_test_storage();
        assert!(storage.get_watermark("files").unwrap().is_none());

        let watermark = IndexWatermark::new("files", at(1_706_540_400_000));
        storage.put_watermark(&watermark).unwrap();
        assert_eq!(storage.get_watermark("files").unwrap(), Some(watermark));
    }

    #[test]
    fn test_watermark_overwrite_and_delete() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_watermark(&IndexWatermark::new("files", at(1_000)))
            .unwrap();
        storage
            .put_watermark(&IndexWatermark::new("files", at(2_000)))
            .unwrap();
        assert_eq!(
            storage.get_watermark("files").unwrap().unwrap().last_modified,
            at(2_000)
        );

        storage.delete_watermark("files").unwrap();
        assert!(storage.get_watermark("files").unwrap().is_none());
        storage.delete_watermark("files").unwrap();
    }

    #[test]
    fn test_list_watermarks() {
        let (storage, _temp) = create_test_storage();
        for name in ["mail", "files", "contacts"] {
            storage
                .put_watermark(&IndexWatermark::new(name, at(5_000)))
                .unwrap();
        }
        let names: Vec<_> = storage
            .list_watermarks()
            .unwrap()
            .into_iter()
            .map(|w| w.index_name)
            .collect();
        assert_eq!(names, vec!["contacts", "files", "mail"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = Storage::open(temp_dir.path()).unwrap();
            storage
                .put_watermark(&IndexWatermark::new("files", at(42_000)))
                .unwrap();
            storage.flush().unwrap();
        }
        let storage = Storage::open(temp_dir.path()).unwrap();
        assert_eq!(
            storage.get_watermark("files").unwrap().unwrap().last_modified,
            at(42_000)
        );
    }

    #[tokio::test]
    async fn test_watermark_store_contract() {
        let (storage, _temp) = create_test_storage();
        let store: &dyn WatermarkStore = &storage;

        assert!(store.get_last_modified("files").await.unwrap().is_none());
        store
            .upsert_watermark(&IndexWatermark::new("files", at(7_000)))
            .await
            .unwrap();
        assert_eq!(store.get_last_modified("files").await.unwrap(), Some(at(7_000)));
        store.delete_watermark("files").await.unwrap();
        assert!(store.get_last_modified("files").await.unwrap().is_none());
    }
}
