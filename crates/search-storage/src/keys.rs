//! Key encoding for the watermark column family.
//!
//! Key format: `wm:{index_name}`

use crate::error::StorageError;

const WATERMARK_PREFIX: &str = "wm:";

/// Key for a reindex watermark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkKey {
    pub index_name: String,
}

impl WatermarkKey {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }

    /// Prefix shared by every watermark key
    pub fn prefix() -> &'static [u8] {
        WATERMARK_PREFIX.as_bytes()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}{}", WATERMARK_PREFIX, self.index_name).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let index_name = s
            .strip_prefix(WATERMARK_PREFIX)
            .ok_or_else(|| StorageError::Key(format!("Not a watermark key: {}", s)))?;
        if index_name.is_empty() {
            return Err(StorageError::Key("Empty index name".to_string()));
        }
        Ok(Self::new(index_name))
    }
}
