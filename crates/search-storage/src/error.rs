//! Watermark store errors.

use search_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// The database was opened without the watermark column family
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// A key in the watermark column family has no index-name prefix
    #[error("Malformed watermark key: {0}")]
    Key(String),

    /// Stored watermark bytes are not a valid watermark record
    #[error("Corrupt watermark: {0}")]
    Corrupt(String),
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        CoreError::Store(err.to_string())
    }
}
