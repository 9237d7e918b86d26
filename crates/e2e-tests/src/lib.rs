//! End-to-end test infrastructure for tenant-search.
//!
//! Provides a shared TestHarness wiring the engine to the in-memory backend,
//! the RocksDB watermark store and a notification bus shared by several
//! existence caches, plus sample entities and a table-like reindex source.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use search_backend::{MemoryBackend, SearchBackend};
use search_engine::{
    EngineConfig, EngineError, ExistenceCache, IndexEngine, LocalNotificationBus, ReindexRange,
    ReindexSource,
};
use search_storage::Storage;
use search_types::{
    AnalyzerRef, CharFilter, DocumentPayload, EntityId, IndexMapping, IndexableEntity,
    NotificationBus, Tokenizer, WatermarkStore,
};

/// A stored file with extractable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: i64,
    pub tenant_id: i32,
    pub title: String,
    pub folder_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub document: DocumentPayload,
}

impl IndexableEntity for File {
    const IS_DOCUMENT: bool = true;

    fn index_name() -> &'static str {
        "files"
    }

    fn id(&self) -> EntityId {
        EntityId::Int(self.id)
    }

    fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    fn mapping() -> IndexMapping {
        IndexMapping::new()
            .text_with("Title", AnalyzerRef::Tokenizer(Tokenizer::Whitespace))
            .long("FolderId")
            .keyword("Tags")
            .text_with("Content", AnalyzerRef::Document)
    }

    fn payload(&self) -> Option<&DocumentPayload> {
        Some(&self.document)
    }

    fn payload_mut(&mut self) -> Option<&mut DocumentPayload> {
        Some(&mut self.document)
    }
}

/// A mail message without attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub tenant_id: i32,
    pub subject: String,
    #[serde(default)]
    pub labels: Vec<Value>,
}

impl IndexableEntity for Message {
    fn index_name() -> &'static str {
        "mail"
    }

    fn id(&self) -> EntityId {
        EntityId::Int(self.id)
    }

    fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    fn mapping() -> IndexMapping {
        IndexMapping::new().text_with("Subject", AnalyzerRef::CharFilter(CharFilter::Html))
    }
}

/// Build a file whose payload holds `size` bytes.
pub fn file(id: i64, tenant_id: i32, title: &str, size: usize) -> File {
    File {
        id,
        tenant_id,
        title: title.to_string(),
        folder_id: 1,
        tags: Vec::new(),
        document: DocumentPayload::new(vec![b'x'; size]),
    }
}

pub fn message(id: i64, tenant_id: i32, subject: &str) -> Message {
    Message {
        id,
        tenant_id,
        subject: subject.to_string(),
        labels: Vec::new(),
    }
}

/// Fixed timestamp `secs` seconds after 2024-01-29T15:00:00Z.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_706_540_400 + secs, 0)
        .single()
        .expect("valid timestamp")
}

/// Shared test harness for E2E tests.
///
/// Every cache created with [`TestHarness::cache`] stands for one process of
/// a deployment: all of them share the backend and the notification bus.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Durable watermark store
    pub storage: Arc<Storage>,
    pub backend: Arc<MemoryBackend>,
    pub bus: Arc<LocalNotificationBus>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage = open_storage(temp_dir.path());
        Self {
            _temp_dir: temp_dir,
            storage,
            backend: Arc::new(MemoryBackend::new()),
            bus: Arc::new(LocalNotificationBus::new()),
        }
    }

    /// A fresh existence cache subscribed to the shared bus.
    pub fn cache(&self) -> Arc<ExistenceCache> {
        let bus: Arc<dyn NotificationBus> = self.bus.clone();
        ExistenceCache::new(bus)
    }

    pub fn engine<T: IndexableEntity>(
        &self,
        cache: &Arc<ExistenceCache>,
        config: EngineConfig,
    ) -> IndexEngine<T> {
        let backend: Arc<dyn SearchBackend> = self.backend.clone();
        let watermarks: Arc<dyn WatermarkStore> = self.storage.clone();
        IndexEngine::new(backend, cache.clone(), watermarks, config)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Open RocksDB watermark storage at `path`.
pub fn open_storage(path: &Path) -> Arc<Storage> {
    Arc::new(Storage::open(path).expect("Failed to open watermark storage"))
}

struct Row<T> {
    id: i64,
    modified: DateTime<Utc>,
    entity: T,
}

/// In-memory stand-in for a relational table with a modification column.
pub struct TableSource<T> {
    rows: Mutex<Vec<Row<T>>>,
    fail_at: Mutex<Option<i64>>,
    fetched_pages: Mutex<Vec<(i64, i64)>>,
}

impl<T: Clone> TableSource<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_at: Mutex::new(None),
            fetched_pages: Mutex::new(Vec::new()),
        }
    }

    /// Insert or replace the row with `id`.
    pub fn upsert(&self, id: i64, modified: DateTime<Utc>, entity: T) {
        let mut rows = self.rows.lock().expect("rows lock");
        rows.retain(|row| row.id != id);
        rows.push(Row {
            id,
            modified,
            entity,
        });
        rows.sort_by_key(|row| row.id);
    }

    /// Fail the page starting at `start` until cleared with `None`.
    pub fn fail_page(&self, start: Option<i64>) {
        *self.fail_at.lock().expect("fail lock") = start;
    }

    /// `(start, step)` of every page requested so far.
    pub fn fetched_pages(&self) -> Vec<(i64, i64)> {
        self.fetched_pages.lock().expect("pages lock").clone()
    }
}

impl<T: Clone> Default for TableSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: IndexableEntity + Clone> ReindexSource<T> for TableSource<T> {
    async fn count_since(&self, since: DateTime<Utc>) -> Result<ReindexRange, EngineError> {
        let rows = self.rows.lock().expect("rows lock");
        let changed: Vec<i64> = rows
            .iter()
            .filter(|row| row.modified > since)
            .map(|row| row.id)
            .collect();
        Ok(ReindexRange::new(
            changed.len() as i64,
            changed.iter().copied().max().unwrap_or(0),
            changed.iter().copied().min().unwrap_or(0),
        ))
    }

    async fn fetch_page(
        &self,
        start: i64,
        step: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<T>, EngineError> {
        self.fetched_pages
            .lock()
            .expect("pages lock")
            .push((start, step));
        if *self.fail_at.lock().expect("fail lock") == Some(start) {
            return Err(EngineError::Source(format!("page at {} unavailable", start)));
        }
        let rows = self.rows.lock().expect("rows lock");
        Ok(rows
            .iter()
            .filter(|row| row.id >= start && row.id < start + step && row.modified > since)
            .map(|row| row.entity.clone())
            .collect())
    }
}
