//! Per-entity-type façade over the search backend.
//!
//! An [`IndexEngine`] keeps one index in sync with records of `T`: it creates
//! the index on first use, writes entities in memory-bounded bulk groups,
//! compiles partial updates into scripts, and scopes every query-shaped
//! operation to a tenant.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use search_backend::{
    BulkOperation, BulkRequest, BulkResponse, DeleteRequest, IndexDefinition, IndexRequest,
    SearchBackend, SearchResponse, UpdateBody, UpdateRequest,
};
use search_types::{
    FieldPath, IndexableEntity, Settings, UpdateAction, UpdateDescriptor, WatermarkStore,
};

use crate::batch::{BatchPlanner, PlannedBatch};
use crate::error::EngineError;
use crate::existence::ExistenceCache;
use crate::scope::{QueryScope, Selector};
use crate::script::ScriptBuilder;

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Payload bytes one bulk group must stay below
    pub memory_limit_bytes: u64,
    /// Ingest pipeline applied to document types
    pub attachment_pipeline: String,
    /// Smallest id range requested per reindex page
    pub reindex_page_floor: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 10 * 1024 * 1024,
            attachment_pipeline: "attachments".to_string(),
            reindex_page_floor: 1000,
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            memory_limit_bytes: settings.memory_limit_bytes,
            attachment_pipeline: settings.attachment_pipeline.clone(),
            reindex_page_floor: settings.reindex_page_floor,
        }
    }

    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    pub fn with_attachment_pipeline(mut self, name: impl Into<String>) -> Self {
        self.attachment_pipeline = name.into();
        self
    }

    pub fn with_reindex_page_floor(mut self, floor: i64) -> Self {
        self.reindex_page_floor = floor;
        self
    }
}

/// Outcome of [`IndexEngine::index_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Entities handed in
    pub submitted: usize,
    /// Bulk calls issued
    pub bulk_requests: usize,
    /// Entities written alone because of payload size
    pub oversized: usize,
    /// Entities the backend accepted
    pub indexed: usize,
    /// Entities rejected or skipped after a failed single write
    pub failed: usize,
}

impl IndexSummary {
    /// Fold a per-page summary into a running total.
    pub fn merge(&mut self, other: &IndexSummary) {
        self.submitted += other.submitted;
        self.bulk_requests += other.bulk_requests;
        self.oversized += other.oversized;
        self.indexed += other.indexed;
        self.failed += other.failed;
    }
}

/// Keeps the index of `T` synchronized with caller-supplied records.
pub struct IndexEngine<T: IndexableEntity> {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<ExistenceCache>,
    watermarks: Arc<dyn WatermarkStore>,
    config: EngineConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T: IndexableEntity> IndexEngine<T> {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<ExistenceCache>,
        watermarks: Arc<dyn WatermarkStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            backend,
            cache,
            watermarks,
            config,
            _entity: PhantomData,
        }
    }

    pub fn index_name(&self) -> &'static str {
        T::index_name()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ExistenceCache> {
        &self.cache
    }

    pub(crate) fn watermarks(&self) -> &dyn WatermarkStore {
        self.watermarks.as_ref()
    }

    /// Index definition derived from the entity type.
    pub fn definition(&self) -> IndexDefinition {
        IndexDefinition::new(T::index_name(), T::mapping()).with_document_analyzer(T::IS_DOCUMENT)
    }

    /// Make sure the index exists. Returns whether it does afterwards.
    ///
    /// Failures are logged, never returned: the following write surfaces
    /// the real problem if the index is still missing.
    pub async fn create_if_absent(&self) -> bool {
        let index = T::index_name();
        if self.cache.is_known(index) {
            return true;
        }

        let _guard = self.cache.lock_creation().await;
        if self.cache.is_known(index) {
            return true;
        }

        if self.cache.probe(self.backend.as_ref(), index).await {
            self.cache.mark_exists(index);
            return true;
        }

        let definition = self.definition();
        match self.backend.create_index(&definition).await {
            Ok(()) => {
                self.cache.mark_exists(index);
                info!(
                    index,
                    analyzers = definition.analyzer_names().len(),
                    "Created index"
                );
                true
            }
            Err(e) => {
                warn!(index, error = %e, "Failed to create index");
                false
            }
        }
    }

    /// Write one entity. A document payload is released afterwards.
    pub async fn index(&self, entity: &mut T, immediate: bool) -> Result<(), EngineError> {
        self.create_if_absent().await;
        let result = self.write_single(entity, immediate).await;
        release_payload(entity);
        result
    }

    /// Write many entities in memory-bounded bulk groups.
    ///
    /// Items the backend rejects individually are logged and counted. A
    /// failed single write of an oversized entity is logged and skipped. A
    /// bulk call that fails as a whole stops the run.
    pub async fn index_many(
        &self,
        entities: &mut [T],
        immediate: bool,
    ) -> Result<IndexSummary, EngineError> {
        let mut summary = IndexSummary {
            submitted: entities.len(),
            ..Default::default()
        };
        if entities.is_empty() {
            return Ok(summary);
        }

        self.create_if_absent().await;
        let index = T::index_name();
        let sizes: Vec<u64> = entities
            .iter()
            .map(|e| e.payload().map_or(0, |p| p.len() as u64))
            .collect();
        let planner = BatchPlanner::new(self.config.memory_limit_bytes);

        for batch in planner.plan(&sizes, T::IS_DOCUMENT) {
            match batch {
                PlannedBatch::Bulk(range) => {
                    let result = self.write_bulk(&entities[range.clone()], immediate).await;
                    entities[range.clone()].iter_mut().for_each(release_payload);
                    let response = result?;

                    summary.bulk_requests += 1;
                    summary.indexed += response.indexed;
                    summary.failed += response.failures.len();
                    for failure in &response.failures {
                        warn!(
                            index,
                            id = %failure.id,
                            status = failure.status,
                            reason = %failure.reason,
                            "Bulk item rejected"
                        );
                    }
                    debug!(index, start = range.start, end = range.end, "Submitted bulk group");
                }
                PlannedBatch::Oversized(position) => {
                    let entity = &mut entities[position];
                    let result = self.write_single(entity, immediate).await;
                    release_payload(entity);

                    summary.oversized += 1;
                    match result {
                        Ok(()) => summary.indexed += 1,
                        Err(e) => {
                            summary.failed += 1;
                            warn!(
                                index,
                                id = %entity.id(),
                                size = sizes[position],
                                error = %e,
                                "Oversized document write failed, skipping"
                            );
                        }
                    }
                }
            }
        }

        info!(
            index,
            submitted = summary.submitted,
            indexed = summary.indexed,
            failed = summary.failed,
            bulk_requests = summary.bulk_requests,
            "Indexed entities"
        );
        Ok(summary)
    }

    /// Replace the stored document with the entity, creating it if missing.
    pub async fn update(&self, entity: &T, immediate: bool) -> Result<(), EngineError> {
        self.create_if_absent().await;
        let request = UpdateRequest {
            index: T::index_name().to_string(),
            id: entity.id(),
            body: UpdateBody::Doc {
                doc: serde_json::to_value(entity)?,
                upsert: true,
            },
            refresh: immediate,
        };
        self.backend.update_document(request).await?;
        Ok(())
    }

    /// Apply field-level changes to the stored document of `entity`.
    ///
    /// With no descriptors this is a full [`update`](Self::update). When
    /// every descriptor is `Keep` no call is made.
    pub async fn update_fields(
        &self,
        entity: &T,
        descriptors: &[UpdateDescriptor],
        immediate: bool,
    ) -> Result<(), EngineError> {
        if descriptors.is_empty() {
            return self.update(entity, immediate).await;
        }

        let script = ScriptBuilder::compile(descriptors)?;
        if script.is_empty() {
            debug!(index = T::index_name(), id = %entity.id(), "Nothing to update");
            return Ok(());
        }

        self.create_if_absent().await;
        let request = UpdateRequest {
            index: T::index_name().to_string(),
            id: entity.id(),
            body: UpdateBody::Script(script),
            refresh: immediate,
        };
        self.backend.update_document(request).await?;
        Ok(())
    }

    /// Add, replace or remove list elements on the stored document of `entity`.
    pub async fn update_list(
        &self,
        entity: &T,
        action: UpdateAction,
        path: impl Into<FieldPath>,
        values: Vec<Value>,
        immediate: bool,
    ) -> Result<(), EngineError> {
        let descriptor = UpdateDescriptor::ListMutate {
            path: path.into(),
            action,
            values,
        };
        self.update_fields(entity, &[descriptor], immediate).await
    }

    /// Apply field-level changes to every document of `tenant_id` matching the selector.
    pub async fn update_by_query(
        &self,
        tenant_id: i32,
        selector: &Selector<T>,
        descriptors: &[UpdateDescriptor],
        immediate: bool,
    ) -> Result<u64, EngineError> {
        if descriptors.is_empty() {
            return Err(EngineError::InvalidArgument(
                "update by query needs at least one field".to_string(),
            ));
        }

        let script = ScriptBuilder::compile(descriptors)?;
        if script.is_empty() {
            return Ok(0);
        }

        self.create_if_absent().await;
        let request =
            QueryScope::new(tenant_id).update_by_query(T::index_name(), selector, script, immediate);
        let updated = self.backend.update_by_query(request).await?;
        debug!(index = T::index_name(), tenant_id, updated, "Updated by query");
        Ok(updated)
    }

    /// List mutation applied to every document of `tenant_id` matching the selector.
    pub async fn update_list_by_query(
        &self,
        tenant_id: i32,
        selector: &Selector<T>,
        action: UpdateAction,
        path: impl Into<FieldPath>,
        values: Vec<Value>,
        immediate: bool,
    ) -> Result<u64, EngineError> {
        let descriptor = UpdateDescriptor::ListMutate {
            path: path.into(),
            action,
            values,
        };
        self.update_by_query(tenant_id, selector, &[descriptor], immediate)
            .await
    }

    pub async fn delete(&self, entity: &T, immediate: bool) -> Result<(), EngineError> {
        let request = DeleteRequest {
            index: T::index_name().to_string(),
            id: entity.id(),
            refresh: immediate,
        };
        self.backend.delete_document(request).await?;
        Ok(())
    }

    /// Delete every document of `tenant_id` matching the selector.
    pub async fn delete_by_query(
        &self,
        tenant_id: i32,
        selector: &Selector<T>,
        immediate: bool,
    ) -> Result<u64, EngineError> {
        let request = QueryScope::new(tenant_id).delete_by_query(T::index_name(), selector, immediate);
        let deleted = self.backend.delete_by_query(request).await?;
        debug!(index = T::index_name(), tenant_id, deleted, "Deleted by query");
        Ok(deleted)
    }

    pub async fn search(&self, tenant_id: i32, selector: &Selector<T>) -> Result<Vec<T>, EngineError> {
        Ok(self.search_with_total(tenant_id, selector).await?.0)
    }

    /// Matching entities of the requested page plus the total match count.
    pub async fn search_with_total(
        &self,
        tenant_id: i32,
        selector: &Selector<T>,
    ) -> Result<(Vec<T>, u64), EngineError> {
        let response = self.run_search(tenant_id, selector, false).await?;
        let mut entities = Vec::with_capacity(response.hits.len());
        for hit in response.hits {
            match hit.source {
                Some(source) => entities.push(serde_json::from_value(source)?),
                None => debug!(index = T::index_name(), id = %hit.id, "Hit without source"),
            }
        }
        Ok((entities, response.total))
    }

    pub async fn search_ids(
        &self,
        tenant_id: i32,
        selector: &Selector<T>,
    ) -> Result<Vec<String>, EngineError> {
        Ok(self.search_ids_with_total(tenant_id, selector).await?.0)
    }

    /// Identifiers of the requested page plus the total match count.
    pub async fn search_ids_with_total(
        &self,
        tenant_id: i32,
        selector: &Selector<T>,
    ) -> Result<(Vec<String>, u64), EngineError> {
        let response = self.run_search(tenant_id, selector, true).await?;
        let ids = response.hits.into_iter().map(|hit| hit.id).collect();
        Ok((ids, response.total))
    }

    pub async fn flush(&self) -> Result<(), EngineError> {
        self.backend.flush(T::index_name()).await?;
        Ok(())
    }

    pub async fn refresh(&self) -> Result<(), EngineError> {
        self.backend.refresh(T::index_name()).await?;
        Ok(())
    }

    /// Drop the index and its watermark, then recreate it empty.
    ///
    /// Every existence cache on the bus forgets the index, so the next write
    /// anywhere in the deployment goes through creation again.
    pub async fn reset_index(&self) -> Result<bool, EngineError> {
        let index = T::index_name();
        self.watermarks.delete_watermark(index).await?;
        self.backend.delete_index(index).await?;
        self.cache.invalidate(index);
        info!(index, "Index cleared");
        Ok(self.create_if_absent().await)
    }

    async fn run_search(
        &self,
        tenant_id: i32,
        selector: &Selector<T>,
        only_ids: bool,
    ) -> Result<SearchResponse, EngineError> {
        let request = QueryScope::new(tenant_id).search(T::index_name(), selector, only_ids);
        Ok(self.backend.search(request).await?)
    }

    fn pipeline(&self) -> Option<String> {
        T::IS_DOCUMENT.then(|| self.config.attachment_pipeline.clone())
    }

    async fn write_single(&self, entity: &T, immediate: bool) -> Result<(), EngineError> {
        let request = IndexRequest {
            index: T::index_name().to_string(),
            id: entity.id(),
            pipeline: self.pipeline(),
            source: serde_json::to_value(entity)?,
            refresh: immediate,
        };
        self.backend.index_document(request).await?;
        Ok(())
    }

    async fn write_bulk(
        &self,
        entities: &[T],
        immediate: bool,
    ) -> Result<BulkResponse, EngineError> {
        let mut request = BulkRequest::new(immediate);
        for entity in entities {
            request.push(BulkOperation {
                index: T::index_name().to_string(),
                id: entity.id(),
                pipeline: self.pipeline(),
                source: serde_json::to_value(entity)?,
            });
        }
        Ok(self.backend.bulk_index(request).await?)
    }
}

fn release_payload<T: IndexableEntity>(entity: &mut T) {
    if let Some(payload) = entity.payload_mut() {
        payload.release();
    }
}
