//! # Observable State Cells
//!
//! A small reactive primitive used for every field of the wallet session.
//!
//! An [`Observable`] holds a value and notifies two kinds of observers when that
//! value changes:
//!
//! - **Synchronous listeners** registered with [`Observable::subscribe`]. They run
//!   inline on the thread that called [`Observable::set`], after the new value is
//!   stored. The session uses these to recompute derived state immediately.
//! - **Async watchers** obtained from [`Observable::watch`]. These are plain
//!   `tokio::sync::watch` receivers, so UI code can `await` changes.
//!
//! Setting a value equal to the current one is a no-op: nobody is notified.
//!
//! ## Example
//!
//! ```rust
//! use lib_wallet::observable::Observable;
//!
//! let connected = Observable::new(false);
//! let id = connected.subscribe(|value| println!("connected = {value}"));
//!
//! assert!(connected.set(true));
//! assert!(!connected.set(true)); // unchanged, listeners not called
//!
//! connected.unsubscribe(id);
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Handle returned by [`Observable::subscribe`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    tx: watch::Sender<T>,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

/// Shared, observable value cell.
///
/// Cloning an `Observable` yields another handle to the same cell.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                tx,
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Current value (cloned).
    pub fn get(&self) -> T {
        self.inner.tx.borrow().clone()
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.tx.borrow())
    }

    /// Replace the value, notifying listeners and watchers if it changed.
    ///
    /// Returns `true` when the value was different from the previous one.
    /// Listeners run after the internal borrow is released, so they may freely
    /// read or set this and other observables.
    pub fn set(&self, value: T) -> bool {
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });

        if changed {
            self.notify();
        }
        changed
    }

    /// Register a synchronous listener called with the new value on every change.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.inner.listeners.lock().retain(|(existing, _)| *existing != id);
    }

    /// Number of registered synchronous listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Async receiver that observes every change of this cell.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.inner.tx.subscribe()
    }

    fn notify(&self) {
        // Snapshot both the value and the listener list so no lock is held while
        // listeners run (they commonly re-enter the session).
        let value = self.get();
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&value);
        }
    }
}

impl<T> fmt::Debug for Observable<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&*self.inner.tx.borrow()).finish()
    }
}
