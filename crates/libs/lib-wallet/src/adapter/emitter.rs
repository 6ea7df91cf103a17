//! Event handler bookkeeping shared by adapter implementations.

use super::{AdapterEvent, AdapterEventKind, EventHandler, HandlerId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Registry of event handlers keyed by [`AdapterEventKind`].
///
/// Adapters embed one of these and forward `on`/`off` to it. `emit` invokes the
/// matching handlers in registration order without holding the internal lock.
#[derive(Default)]
pub struct EventEmitter {
    handlers: Mutex<Vec<(AdapterEventKind, HandlerId, EventHandler)>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: AdapterEventKind, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((event, id, handler));
        id
    }

    pub fn off(&self, event: AdapterEventKind, id: HandlerId) {
        self.handlers
            .lock()
            .retain(|(kind, existing, _)| !(*kind == event && *existing == id));
    }

    pub fn emit(&self, event: &AdapterEvent) {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self, event: AdapterEventKind) -> usize {
        self.handlers.lock().iter().filter(|(kind, _, _)| *kind == event).count()
    }
}
