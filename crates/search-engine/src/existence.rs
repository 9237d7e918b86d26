//! Process-wide memo of which indexes exist on the backend.
//!
//! Reads of a known-present index are lock-free. Unknown or absent entries
//! are resolved by one probe under the creation lock, double-checked so
//! concurrent callers do not probe twice. Invalidation travels over the
//! notification bus so every cache sharing the bus forgets the index.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use search_backend::SearchBackend;
use search_types::{ClearIndexAction, NotificationBus};

/// Lifecycle of one index as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Never probed
    Unknown,
    /// Probed absent, or cleared
    Absent,
    /// Probed or created
    Present,
}

/// Shared existence cache.
pub struct ExistenceCache {
    known: DashMap<String, bool>,
    creation_lock: Mutex<()>,
    bus: Arc<dyn NotificationBus>,
}

impl ExistenceCache {
    /// Create the cache and subscribe it to clear notifications on `bus`.
    pub fn new(bus: Arc<dyn NotificationBus>) -> Arc<Self> {
        let cache = Arc::new(Self {
            known: DashMap::new(),
            creation_lock: Mutex::new(()),
            bus: bus.clone(),
        });

        let weak = Arc::downgrade(&cache);
        bus.subscribe(Arc::new(move |action: &ClearIndexAction| {
            if let Some(cache) = weak.upgrade() {
                cache.forget(&action.index_name);
            }
        }));

        cache
    }

    /// Current lifecycle state of the index.
    pub fn state(&self, index: &str) -> IndexState {
        match self.known.get(index).map(|entry| *entry) {
            None => IndexState::Unknown,
            Some(false) => IndexState::Absent,
            Some(true) => IndexState::Present,
        }
    }

    /// True only if the index is known to exist. Never touches the backend.
    pub fn is_known(&self, index: &str) -> bool {
        self.known.get(index).map(|entry| *entry).unwrap_or(false)
    }

    /// Record that the index exists.
    pub fn mark_exists(&self, index: &str) {
        self.known.insert(index.to_string(), true);
    }

    /// Ask the backend directly. A failed probe counts as "absent".
    pub async fn probe(&self, backend: &dyn SearchBackend, index: &str) -> bool {
        match backend.index_exists(index).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(
                    index,
                    backend = backend.name(),
                    error = %e,
                    "Index existence probe failed, treating as absent"
                );
                false
            }
        }
    }

    /// Whether the index exists, probing at most once per contention window.
    pub async fn exists(&self, backend: &dyn SearchBackend, index: &str) -> bool {
        if self.is_known(index) {
            return true;
        }

        let _guard = self.creation_lock.lock().await;
        if self.is_known(index) {
            return true;
        }

        let exists = self.probe(backend, index).await;
        self.known.insert(index.to_string(), exists);
        debug!(index, exists, "Resolved index existence");
        exists
    }

    /// Serialize index creation across all index names in this process.
    pub async fn lock_creation(&self) -> MutexGuard<'_, ()> {
        self.creation_lock.lock().await
    }

    /// Tell every cache on the bus (this one included) that the index is gone.
    pub fn invalidate(&self, index: &str) {
        self.forget(index);
        self.bus.publish(ClearIndexAction::new(index));
    }

    fn forget(&self, index: &str) {
        self.known.insert(index.to_string(), false);
        debug!(index, "Index marked absent");
    }
}
