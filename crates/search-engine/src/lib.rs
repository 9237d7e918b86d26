//! Multi-tenant indexing engine for tenant-search.
//!
//! This crate keeps a search backend in sync with typed domain records.
//!
//! ## Key Components
//!
//! - [`ExistenceCache`]: process-wide memo of existing indexes, invalidated
//!   over a [`NotificationBus`](search_types::NotificationBus)
//! - [`LocalNotificationBus`]: in-process bus delivering clear notifications
//! - [`BatchPlanner`]: splits entity lists into memory-bounded bulk groups
//! - [`ScriptBuilder`]: compiles update descriptors into update scripts
//! - [`Selector`] and [`QueryScope`]: tenant-scoped query composition
//! - [`IndexEngine`]: the per-entity-type façade tying it all together
//! - [`ReindexSource`] and [`ReindexPass`]: chunked reindex with a resume watermark
//! - [`MemoryWatermarkStore`]: watermark store for tests and one-shot runs
//!
//! ## Example
//!
//! ```ignore
//! use search_engine::{EngineConfig, ExistenceCache, IndexEngine, LocalNotificationBus, Selector};
//!
//! let cache = ExistenceCache::new(Arc::new(LocalNotificationBus::new()));
//! let engine = IndexEngine::<File>::new(backend, cache, watermarks, EngineConfig::default());
//!
//! engine.index_many(&mut files, false).await?;
//! let hits = engine.search(tenant_id, &Selector::new().matches("Title", "budget")).await?;
//! ```

pub mod batch;
pub mod engine;
pub mod error;
pub mod existence;
pub mod notify;
pub mod reindex;
pub mod scope;
pub mod script;
pub mod watermark;

#[cfg(test)]
mod testing;

pub use batch::{BatchPlan, BatchPlanner, PlannedBatch};
pub use engine::{EngineConfig, IndexEngine, IndexSummary};
pub use error::EngineError;
pub use existence::{ExistenceCache, IndexState};
pub use notify::LocalNotificationBus;
pub use reindex::{ReindexPass, ReindexRange, ReindexSource, ReindexSummary};
pub use scope::{QueryScope, Selector};
pub use script::{ScriptBuilder, IDENTITY_FIELD};
pub use watermark::MemoryWatermarkStore;
