//! Storage layer for tenant-search.
//!
//! Provides RocksDB-backed storage with:
//! - A `watermarks` column family keyed by index name
//! - The [`WatermarkStore`](search_types::WatermarkStore) implementation the
//!   reindex protocol resumes from

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::Storage;
pub use error::StorageError;
pub use keys::WatermarkKey;
