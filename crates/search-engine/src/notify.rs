//! In-process notification bus.

use std::sync::RwLock;

use tracing::{debug, warn};

use search_types::{ClearHandler, ClearIndexAction, NotificationBus};

/// Delivers clear notifications synchronously to every subscriber in this
/// process. Bridging to other processes is done by publishing the same
/// action onto an external transport and re-publishing it here.
#[derive(Default)]
pub struct LocalNotificationBus {
    handlers: RwLock<Vec<ClearHandler>>,
}

impl LocalNotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }
}

impl NotificationBus for LocalNotificationBus {
    fn publish(&self, action: ClearIndexAction) {
        // Snapshot so handlers may subscribe or publish without deadlocking.
        let handlers: Vec<ClearHandler> = match self.handlers.read() {
            Ok(handlers) => handlers.clone(),
            Err(e) => {
                warn!(error = %e, "Notification bus poisoned, dropping clear action");
                return;
            }
        };
        debug!(
            index = %action.index_name,
            subscribers = handlers.len(),
            "Publishing clear action"
        );
        for handler in handlers {
            handler(&action);
        }
    }

    fn subscribe(&self, handler: ClearHandler) {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push(handler),
            Err(e) => warn!(error = %e, "Notification bus poisoned, subscription dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let bus = LocalNotificationBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            bus.subscribe(Arc::new(move |action: &ClearIndexAction| {
                assert_eq!(action.index_name, "files");
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(bus.subscriber_count(), 3);

        bus.publish(ClearIndexAction::new("files"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = LocalNotificationBus::new();
        bus.publish(ClearIndexAction::new("files"));
    }
}
