//! # search-types
//!
//! Shared vocabulary for the tenant-search indexing engine.
//!
//! This crate defines the types every other crate agrees on:
//! - Entities: the [`IndexableEntity`] contract and document payloads
//! - Updates: field paths, update descriptors and compiled update scripts
//! - Queries: the [`Filter`] predicate tree and sort keys
//! - Mappings: declared field shapes and analyzer references
//! - Watermarks: reindex progress and the [`WatermarkStore`] contract
//! - Notifications: clear-index actions and the [`NotificationBus`] contract
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use search_types::{Filter, UpdateAction, UpdateDescriptor};
//!
//! let scope = Filter::tenant(1);
//! let change = UpdateDescriptor::list("Tags", UpdateAction::Add, ["urgent"]);
//! assert_eq!(change.path().dotted(), "tags");
//! # let _ = scope;
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod filter;
pub mod mapping;
pub mod notify;
pub mod script;
pub mod watermark;

pub use config::Settings;
pub use entity::{DocumentPayload, EntityId, IndexableEntity};
pub use error::CoreError;
pub use field::{to_lower_camel_case, FieldPath, FieldValue, UpdateAction, UpdateDescriptor};
pub use filter::{Filter, SortField, SortOrder, TENANT_FIELD};
pub use mapping::{AnalyzerRef, CharFilter, FieldKind, FieldMapping, IndexMapping, Tokenizer};
pub use notify::{ClearHandler, ClearIndexAction, NotificationBus};
pub use script::{ScriptStatement, UpdateScript};
pub use watermark::{IndexWatermark, WatermarkStore};
