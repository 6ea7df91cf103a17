//! Adapter event bridge.
//!
//! Keeps session state in sync with the active adapter's own lifecycle events.
//! Exactly one [`AdapterSubscription`] exists at a time; replacing it drops the
//! old one, which unregisters all four handlers from the old adapter before the
//! new adapter's handlers are installed.

use super::SessionInner;
use crate::adapter::{AdapterEvent, AdapterEventKind, AdapterHandle, EventHandler, HandlerId};
use crate::error::WalletError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Handlers registered on one adapter, released on drop.
pub(super) struct AdapterSubscription {
    adapter: AdapterHandle,
    handlers: Vec<(AdapterEventKind, HandlerId)>,
}

impl AdapterSubscription {
    fn install(adapter: AdapterHandle, session: &Arc<SessionInner>) -> Self {
        let handlers = AdapterEventKind::all()
            .iter()
            .map(|&kind| {
                let weak = Arc::downgrade(session);
                let handler: EventHandler = Arc::new(move |event: &AdapterEvent| {
                    if let Some(inner) = weak.upgrade() {
                        handle_event(&inner, event);
                    }
                });
                (kind, adapter.on(kind, handler))
            })
            .collect();

        debug!(adapter = adapter.name(), "Subscribed to adapter events");
        Self { adapter, handlers }
    }
}

impl Drop for AdapterSubscription {
    fn drop(&mut self) {
        for (kind, id) in self.handlers.drain(..) {
            self.adapter.off(kind, id);
        }
        debug!(adapter = self.adapter.name(), "Unsubscribed from adapter events");
    }
}

fn handle_event(inner: &SessionInner, event: &AdapterEvent) {
    match event {
        AdapterEvent::Ready => {
            inner.state.ready.set(true);
        }
        AdapterEvent::Connect(_) => inner.refresh_from_adapter(),
        AdapterEvent::Disconnect => debug!("Adapter reported disconnect"),
        AdapterEvent::Error(e) => {
            inner.report(WalletError::Adapter(e.clone()));
        }
    }
}

/// Swap the subscription over to `adapter` (or to nothing).
///
/// The old subscription is released before the new one is installed. No lock is
/// held while talking to either adapter.
pub(super) fn rebind(inner: &Arc<SessionInner>, adapter: Option<&AdapterHandle>) {
    let previous = inner.subscription.lock().take();
    drop(previous);

    if inner.closed.load(Ordering::SeqCst) {
        return;
    }

    let next = adapter.map(|adapter| AdapterSubscription::install(adapter.clone(), inner));
    let stale = std::mem::replace(&mut *inner.subscription.lock(), next);
    drop(stale);
}
