//! Request and response shapes exchanged with a [`SearchBackend`](crate::SearchBackend).

use serde_json::Value;

use search_types::{EntityId, Filter, SortField, UpdateScript};

/// One document inside a bulk request.
///
/// Bulk requests are heterogeneous: every operation names its own index and
/// optional ingest pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub index: String,
    pub id: EntityId,
    pub pipeline: Option<String>,
    pub source: Value,
}

/// A bulk index call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkRequest {
    pub operations: Vec<BulkOperation>,
    /// Make the writes visible to search before returning
    pub refresh: bool,
}

impl BulkRequest {
    pub fn new(refresh: bool) -> Self {
        Self {
            operations: Vec::new(),
            refresh,
        }
    }

    pub fn push(&mut self, operation: BulkOperation) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A bulk item the backend refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    pub id: String,
    pub status: u16,
    pub reason: String,
}

/// Outcome of a bulk call that reached the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Items written successfully
    pub indexed: usize,
    /// Items rejected individually
    pub failures: Vec<BulkItemFailure>,
}

impl BulkResponse {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Single-document index call.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    pub index: String,
    pub id: EntityId,
    pub pipeline: Option<String>,
    pub source: Value,
    pub refresh: bool,
}

/// Body of an update-by-id call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateBody {
    /// Apply a server-side script
    Script(UpdateScript),
    /// Merge a partial or full document; `upsert` creates it when missing
    Doc { doc: Value, upsert: bool },
}

/// Update-by-id call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub index: String,
    pub id: EntityId,
    pub body: UpdateBody,
    pub refresh: bool,
}

/// Update every document matching a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateByQueryRequest {
    pub index: String,
    pub query: Filter,
    pub script: UpdateScript,
    pub refresh: bool,
}

/// Delete-by-id call.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub index: String,
    pub id: EntityId,
    pub refresh: bool,
}

/// Delete every document matching a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteByQueryRequest {
    pub index: String,
    pub query: Filter,
    pub refresh: bool,
}

/// Search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    pub query: Filter,
    /// Skip `_source` and return identifiers only
    pub only_ids: bool,
    pub sort: Vec<SortField>,
    pub from: Option<usize>,
    pub size: Option<usize>,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>, query: Filter) -> Self {
        Self {
            index: index.into(),
            query,
            only_ids: false,
            sort: Vec::new(),
            from: None,
            size: None,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// `None` for ids-only searches
    pub source: Option<Value>,
}

/// Search result page plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}
