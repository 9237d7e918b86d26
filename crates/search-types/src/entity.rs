//! The contract every indexed type satisfies.
//!
//! An entity is identified by `(index_name, id, tenant_id)`. The index name
//! is stable per type and `id` is unique within it. Document types
//! additionally carry a binary payload that the backend extracts text from
//! through an ingest pipeline.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::mapping::IndexMapping;

/// Identifier of an entity within its index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Integer identifier (relational primary keys)
    Int(i64),
    /// String identifier
    Str(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        EntityId::Int(id as i64)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Str(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Str(id)
    }
}

/// A typed record kept in sync with a backend index.
///
/// The serde representation of the type is the document body sent to the
/// backend, so field names should be lowerCamelCase
/// (`#[serde(rename_all = "camelCase")]`) and must include `tenantId`.
///
/// # Example
///
/// ```
/// use search_types::{EntityId, IndexMapping, IndexableEntity};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Contact {
///     id: i64,
///     tenant_id: i32,
///     display_name: String,
/// }
///
/// impl IndexableEntity for Contact {
///     fn index_name() -> &'static str {
///         "contacts"
///     }
///     fn id(&self) -> EntityId {
///         self.id.into()
///     }
///     fn tenant_id(&self) -> i32 {
///         self.tenant_id
///     }
///     fn mapping() -> IndexMapping {
///         IndexMapping::new().text("DisplayName")
///     }
/// }
/// ```
pub trait IndexableEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Whether the type carries a [`DocumentPayload`] routed through the
    /// content-extraction pipeline.
    const IS_DOCUMENT: bool = false;

    /// Backend index name, stable for the type.
    fn index_name() -> &'static str;

    /// Identifier, unique within the index.
    fn id(&self) -> EntityId;

    /// Tenant owning this record.
    fn tenant_id(&self) -> i32;

    /// Declared field shape used when the index is created.
    fn mapping() -> IndexMapping {
        IndexMapping::default()
    }

    /// Binary payload, for document types.
    fn payload(&self) -> Option<&DocumentPayload> {
        None
    }

    /// Mutable access to the payload so the batch writer can release it.
    fn payload_mut(&mut self) -> Option<&mut DocumentPayload> {
        None
    }
}

/// Binary content attached to a document entity.
///
/// Serialized as `{"data": "<base64>"}` which is the input shape of the
/// attachment ingest pipeline. After the batch writer has transmitted the
/// entity the bytes are released and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    #[serde(default, with = "base64_bytes")]
    data: Option<Vec<u8>>,
}

impl DocumentPayload {
    /// Create a payload holding the given bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    /// Create an empty payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Payload length in bytes (0 once released).
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// True if there are no bytes to transmit.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the bytes, if still held.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Drop the bytes, returning them to the caller if still held.
    pub fn release(&mut self) -> Option<Vec<u8>> {
        self.data.take()
    }

    /// True once the bytes have been released (or were never set).
    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::from(42i64).to_string(), "42");
        assert_eq!(EntityId::from("file-7").to_string(), "file-7");
    }

    #[test]
    fn test_entity_id_untagged_json() {
        assert_eq!(serde_json::to_string(&EntityId::Int(5)).unwrap(), "5");
        assert_eq!(
            serde_json::to_string(&EntityId::Str("a".into())).unwrap(),
            "\"a\""
        );
        let id: EntityId = serde_json::from_str("17").unwrap();
        assert_eq!(id, EntityId::Int(17));
    }

    #[test]
    fn test_payload_release() {
        let mut payload = DocumentPayload::new(vec![1u8; 64]);
        assert_eq!(payload.len(), 64);
        assert!(!payload.is_released());

        let bytes = payload.release().unwrap();
        assert_eq!(bytes.len(), 64);
        assert!(payload.is_released());
        assert_eq!(payload.len(), 0);
        assert!(payload.release().is_none());
    }

    #[test]
    fn test_payload_json_shape() {
        let payload = DocumentPayload::new(b"hello".to_vec());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "data": "aGVsbG8=" }));

        let decoded: DocumentPayload = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.as_bytes(), Some(&b"hello"[..]));

        let released = serde_json::to_value(DocumentPayload::empty()).unwrap();
        assert_eq!(released, serde_json::json!({ "data": null }));
    }

    #[test]
    fn test_payload_missing_data_field() {
        let decoded: DocumentPayload = serde_json::from_str("{}").unwrap();
        assert!(decoded.is_released());
    }
}
