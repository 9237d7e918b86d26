//! The search backend contract.
//!
//! The engine only needs the client side of the protocol: index lifecycle,
//! bulk and single writes, scripted updates, deletes, visibility controls and
//! filtered search. Implementations must be shareable across tasks.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::requests::{
    BulkRequest, BulkResponse, DeleteByQueryRequest, DeleteRequest, IndexRequest, SearchRequest,
    SearchResponse, UpdateByQueryRequest, UpdateRequest,
};
use crate::schema::IndexDefinition;

/// Client for an Elasticsearch-compatible search backend.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &str;

    /// Whether the index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, BackendError>;

    /// Create an index with its analyzers and mapping.
    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), BackendError>;

    /// Delete an index. Deleting a missing index is not an error.
    async fn delete_index(&self, index: &str) -> Result<(), BackendError>;

    /// Write many documents in one call.
    ///
    /// Item-level rejections are reported in the response; only a failure
    /// of the call itself is an `Err`.
    async fn bulk_index(&self, request: BulkRequest) -> Result<BulkResponse, BackendError>;

    /// Write one document.
    async fn index_document(&self, request: IndexRequest) -> Result<(), BackendError>;

    /// Update one document by id with a script or a document body.
    async fn update_document(&self, request: UpdateRequest) -> Result<(), BackendError>;

    /// Apply a script to every matching document; returns the number updated.
    async fn update_by_query(&self, request: UpdateByQueryRequest) -> Result<u64, BackendError>;

    /// Delete one document by id.
    async fn delete_document(&self, request: DeleteRequest) -> Result<(), BackendError>;

    /// Delete every matching document; returns the number deleted.
    async fn delete_by_query(&self, request: DeleteByQueryRequest) -> Result<u64, BackendError>;

    /// Persist buffered writes of the index.
    async fn flush(&self, index: &str) -> Result<(), BackendError>;

    /// Make all writes of the index visible to search.
    async fn refresh(&self, index: &str) -> Result<(), BackendError>;

    /// Run a filtered search.
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, BackendError>;
}
