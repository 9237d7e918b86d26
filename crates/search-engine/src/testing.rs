//! Entities and wiring shared by the unit tests of this crate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use search_backend::{MemoryBackend, SearchBackend};
use search_types::{
    AnalyzerRef, CharFilter, DocumentPayload, EntityId, IndexMapping, IndexableEntity,
    NotificationBus, Tokenizer, WatermarkStore,
};

use crate::engine::{EngineConfig, IndexEngine};
use crate::existence::ExistenceCache;
use crate::notify::LocalNotificationBus;
use crate::watermark::MemoryWatermarkStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub tenant_id: i32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub shares: Vec<Value>,
}

impl IndexableEntity for Note {
    fn index_name() -> &'static str {
        "notes"
    }

    fn id(&self) -> EntityId {
        EntityId::Int(self.id)
    }

    fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    fn mapping() -> IndexMapping {
        IndexMapping::new()
            .text_with("title", AnalyzerRef::Tokenizer(Tokenizer::Standard))
            .keyword("owner")
            .keyword("tags")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub tenant_id: i32,
    pub title: String,
    pub document: DocumentPayload,
}

impl IndexableEntity for Attachment {
    const IS_DOCUMENT: bool = true;

    fn index_name() -> &'static str {
        "attachments"
    }

    fn id(&self) -> EntityId {
        EntityId::Int(self.id)
    }

    fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    fn mapping() -> IndexMapping {
        IndexMapping::new()
            .text_with("title", AnalyzerRef::CharFilter(CharFilter::Html))
            .text_with("content", AnalyzerRef::Document)
    }

    fn payload(&self) -> Option<&DocumentPayload> {
        Some(&self.document)
    }

    fn payload_mut(&mut self) -> Option<&mut DocumentPayload> {
        Some(&mut self.document)
    }
}

pub fn note(id: i64, tenant_id: i32, title: &str) -> Note {
    Note {
        id,
        tenant_id,
        title: title.to_string(),
        owner: None,
        tags: Vec::new(),
        shares: Vec::new(),
    }
}

pub fn attachment(id: i64, tenant_id: i32, size: usize) -> Attachment {
    Attachment {
        id,
        tenant_id,
        title: format!("attachment {}", id),
        document: DocumentPayload::new(vec![b'a'; size]),
    }
}

/// Memory backend, watermark store and cache wired together.
pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub watermarks: Arc<MemoryWatermarkStore>,
    pub bus: Arc<LocalNotificationBus>,
    pub cache: Arc<ExistenceCache>,
    pub config: EngineConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let bus = Arc::new(LocalNotificationBus::new());
        let shared: Arc<dyn NotificationBus> = bus.clone();
        Self {
            backend: Arc::new(MemoryBackend::new()),
            watermarks: Arc::new(MemoryWatermarkStore::new()),
            cache: ExistenceCache::new(shared),
            bus,
            config,
        }
    }

    pub fn engine<T: IndexableEntity>(&self) -> IndexEngine<T> {
        let backend: Arc<dyn SearchBackend> = self.backend.clone();
        let watermarks: Arc<dyn WatermarkStore> = self.watermarks.clone();
        IndexEngine::new(backend, self.cache.clone(), watermarks, self.config.clone())
    }
}
