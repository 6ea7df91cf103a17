//! Auto-connect watcher.
//!
//! Runs after every derivation, whenever `adapter`, `ready`, `connected`,
//! `connecting` or `disconnecting` changes, and once more when a busy slot is
//! released. When auto-connect is enabled and a ready, disconnected, idle adapter
//! is active, it claims `connecting` and connects in a background task. Failures
//! clear the persisted selection and are otherwise swallowed.

use super::{Operation, SessionInner};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(super) fn check(inner: &Arc<SessionInner>) {
    if !inner.auto_connect || inner.deriving.load(Ordering::SeqCst) {
        return;
    }

    let state = &inner.state;
    let Some(adapter) = state.adapter.get() else {
        return;
    };
    if !state.ready.get()
        || state.connected.get()
        || state.connecting.get()
        || state.disconnecting.get()
    {
        return;
    }

    let Some(runtime) = inner.runtime.clone() else {
        warn!(adapter = adapter.name(), "No Tokio runtime available, skipping auto-connect");
        return;
    };

    if !inner.claim(Operation::Connect) {
        return;
    }

    info!(adapter = adapter.name(), "Auto-connecting wallet");
    let weak = Arc::downgrade(inner);
    runtime.spawn(async move {
        let result = adapter.connect().await;

        let Some(inner) = weak.upgrade() else {
            return;
        };

        match result {
            Ok(()) => inner.refresh_if_current(&adapter),
            Err(e) => {
                warn!(adapter = adapter.name(), error = %e, "Auto-connect failed, clearing wallet selection");
                inner.selected_provider.set(None);
            }
        }
        inner.release(Operation::Connect);
    });
}
