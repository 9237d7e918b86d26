//! Cache-invalidation notifications.
//!
//! Clearing an index publishes a [`ClearIndexAction`]; every subscriber,
//! in this process or another one bridged onto the same bus, forgets that
//! the index exists. Delivery is at-least-once so handlers must be
//! idempotent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// "This index may no longer exist."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClearIndexAction {
    pub index_name: String,
}

impl ClearIndexAction {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }
}

/// Subscriber callback.
pub type ClearHandler = Arc<dyn Fn(&ClearIndexAction) + Send + Sync>;

/// Publish/subscribe transport for clear notifications.
pub trait NotificationBus: Send + Sync {
    /// Deliver the action to every subscriber, including the publisher's own.
    fn publish(&self, action: ClearIndexAction);

    /// Register a handler for all clear notifications.
    fn subscribe(&self, handler: ClearHandler);
}
