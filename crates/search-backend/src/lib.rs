//! # search-backend
//!
//! Client side of the search backend protocol for tenant-search.
//!
//! ## Features
//! - [`SearchBackend`] trait covering index lifecycle, bulk and single writes,
//!   scripted updates, query-shaped updates and deletes, and filtered search
//! - [`IndexDefinition`] with the generated analyzer set and field mapping
//! - [`ElasticBackend`]: Elasticsearch REST API over reqwest
//! - [`MemoryBackend`]: in-process evaluator with call recording and failure
//!   injection, for tests and local development

pub mod backend;
pub mod elastic;
pub mod error;
pub mod memory;
pub mod requests;
pub mod schema;

pub use backend::SearchBackend;
pub use elastic::{filter_to_query, ElasticBackend, ElasticConfig};
pub use error::BackendError;
pub use memory::{BackendCall, BackendOp, MemoryBackend, DEFAULT_SEARCH_SIZE};
pub use requests::{
    BulkItemFailure, BulkOperation, BulkRequest, BulkResponse, DeleteByQueryRequest,
    DeleteRequest, IndexRequest, SearchHit, SearchRequest, SearchResponse, UpdateBody,
    UpdateByQueryRequest, UpdateRequest,
};
pub use schema::{IndexDefinition, IO_MAPPINGS};
