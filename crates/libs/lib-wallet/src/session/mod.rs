//! # Wallet Session Store
//!
//! Tracks the selected wallet provider, mirrors the active adapter's connection
//! lifecycle, and forwards signing calls to it.
//!
//! ## Module Overview
//!
//! ```text
//! session/
//! ├── mod.rs           - WalletSession (select/connect/disconnect/sign/send)
//! ├── bridge.rs        - adapter event subscriptions (RAII guard)
//! ├── auto_connect.rs  - background connect when a ready adapter appears
//! └── snapshot.rs      - serializable view of the session state
//! ```
//!
//! ## State Flow
//!
//! ```text
//!  select() / refresh_selection()
//!        │
//!        ▼
//!  selected_provider ──derive──▶ wallet, adapter, ready, public_key, connected
//!                                   │
//!                                   ├──▶ bridge: off(old adapter) / on(new adapter)
//!                                   └──▶ auto-connect check
//! ```
//!
//! Every field lives in an [`Observable`], so UI code can either read values
//! directly or `await` changes through [`Observable::watch`].
//!
//! ## Busy Flags
//!
//! `connecting` and `disconnecting` are the only protection against overlapping
//! calls. Both are claimed through one busy slot, so at most one of them is ever
//! true. A `connect()` issued while either operation is in flight returns
//! immediately, as does a second `disconnect()`. A `disconnect()` issued during a
//! connect waits for it to settle and then disconnects.
//!
//! ## Usage Pattern
//!
//! ```rust,no_run
//! use lib_wallet::{MemoryStore, PersistedValue, WalletRegistry, WalletSession};
//! use std::sync::Arc;
//!
//! # async fn example(registry: WalletRegistry) -> lib_wallet::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let persisted = PersistedValue::new(store, "solana-wallet-provider");
//! let session = WalletSession::new(registry, persisted, false);
//!
//! session.select(Some("Phantom")).await;
//! session.connect().await?;
//!
//! if let Some(signature) = session.sign_message(b"hello").await? {
//!     println!("signed: {signature}");
//! }
//! # Ok(())
//! # }
//! ```

mod auto_connect;
mod bridge;
mod snapshot;

pub use snapshot::SessionSnapshot;

use crate::adapter::{AdapterHandle, Capability, SendTransactionOptions};
use crate::config::SessionConfig;
use crate::error::{Result, WalletError};
use crate::observable::Observable;
use crate::opener::{BrowserOpener, UrlOpener};
use crate::registry::{WalletDescriptor, WalletRegistry};
use crate::storage::{FileStore, PersistedValue};
use bridge::AdapterSubscription;
use parking_lot::Mutex;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Buffered errors per error-channel subscriber.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Observable fields of a session.
///
/// Treat these as read-only: the session owns every write. Change the selection
/// with [`WalletSession::select`].
#[derive(Debug, Clone)]
pub struct SessionState {
    pub selected_provider: Observable<Option<String>>,
    pub wallet: Observable<Option<WalletDescriptor>>,
    pub adapter: Observable<Option<AdapterHandle>>,
    pub public_key: Observable<Option<Pubkey>>,
    pub ready: Observable<bool>,
    pub connected: Observable<bool>,
    pub connecting: Observable<bool>,
    pub disconnecting: Observable<bool>,
}

struct SessionInner {
    registry: WalletRegistry,
    auto_connect: bool,
    selected_provider: PersistedValue,
    state: SessionState,
    subscription: Mutex<Option<AdapterSubscription>>,
    /// Operation currently owning `connecting` / `disconnecting`
    busy: Mutex<Option<Operation>>,
    deriving: AtomicBool,
    closed: AtomicBool,
    errors: broadcast::Sender<WalletError>,
    opener: Arc<dyn UrlOpener>,
    runtime: Option<Handle>,
}

/// The wallet session. Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<SessionInner>,
}

impl WalletSession {
    /// Create a session that opens install pages in the system browser.
    ///
    /// The persisted selection is read and resolved immediately. When
    /// `auto_connect` is set, a ready adapter is connected in the background on
    /// the Tokio runtime current at construction time.
    pub fn new(registry: WalletRegistry, selected_provider: PersistedValue, auto_connect: bool) -> Self {
        Self::with_opener(registry, selected_provider, auto_connect, Arc::new(BrowserOpener))
    }

    pub fn with_opener(
        registry: WalletRegistry,
        selected_provider: PersistedValue,
        auto_connect: bool,
        opener: Arc<dyn UrlOpener>,
    ) -> Self {
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let state = SessionState {
            selected_provider: selected_provider.observable().clone(),
            wallet: Observable::new(None),
            adapter: Observable::new(None),
            public_key: Observable::new(None),
            ready: Observable::new(false),
            connected: Observable::new(false),
            connecting: Observable::new(false),
            disconnecting: Observable::new(false),
        };

        let inner = Arc::new(SessionInner {
            registry,
            auto_connect,
            selected_provider,
            state,
            subscription: Mutex::new(None),
            busy: Mutex::new(None),
            deriving: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            errors,
            opener,
            runtime: Handle::try_current().ok(),
        });

        inner.install_watchers();
        inner.derive();

        info!(
            wallets = inner.registry.len(),
            selected = ?inner.selected_provider.get(),
            auto_connect,
            "Wallet session initialized"
        );

        Self { inner }
    }

    /// Build a session backed by a [`FileStore`] in `config.storage_dir`.
    pub fn from_config(config: &SessionConfig, registry: WalletRegistry) -> Result<Self> {
        config.validate()?;
        let store = FileStore::new(&config.storage_dir)?;
        let persisted = PersistedValue::new(Arc::new(store), config.storage_key.clone());
        Ok(Self::new(registry, persisted, config.auto_connect))
    }

    // ========== State ==========

    pub fn state(&self) -> &SessionState {
        &self.inner.state
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.inner.registry
    }

    pub fn wallets_by_provider(&self) -> &HashMap<String, WalletDescriptor> {
        self.inner.registry.wallets_by_provider()
    }

    pub fn auto_connect(&self) -> bool {
        self.inner.auto_connect
    }

    pub fn selected_provider(&self) -> Option<String> {
        self.inner.selected_provider.get()
    }

    pub fn wallet(&self) -> Option<WalletDescriptor> {
        self.inner.state.wallet.get()
    }

    pub fn adapter(&self) -> Option<AdapterHandle> {
        self.inner.state.adapter.get()
    }

    pub fn public_key(&self) -> Option<Pubkey> {
        self.inner.state.public_key.get()
    }

    pub fn ready(&self) -> bool {
        self.inner.state.ready.get()
    }

    pub fn connected(&self) -> bool {
        self.inner.state.connected.get()
    }

    pub fn connecting(&self) -> bool {
        self.inner.state.connecting.get()
    }

    pub fn disconnecting(&self) -> bool {
        self.inner.state.disconnecting.get()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self)
    }

    /// Receive every error reported by the session and the active adapter.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<WalletError> {
        self.inner.errors.subscribe()
    }

    /// Re-read the persisted selection, picking up changes made elsewhere.
    pub fn refresh_selection(&self) -> Result<bool> {
        Ok(self.inner.selected_provider.refresh()?)
    }

    // ========== Actions ==========

    /// Switch the active provider. `None` clears the selection.
    ///
    /// No-op when `provider` is already selected. The current adapter is
    /// disconnected first; a failing disconnect is logged and does not block the
    /// switch.
    pub async fn select(&self, provider: Option<&str>) {
        let inner = &self.inner;
        if inner.selected_provider.get().as_deref() == provider {
            return;
        }

        if let Some(adapter) = inner.state.adapter.get() {
            if let Err(e) = adapter.disconnect().await {
                warn!(adapter = adapter.name(), error = %e, "Disconnect before provider switch failed");
            }
        }

        if let Some(name) = provider {
            if !inner.registry.contains(name) {
                warn!(provider = name, "Selected provider is not in the wallet registry");
            }
        }

        info!(provider = ?provider, "Wallet provider selected");
        inner.selected_provider.set(provider.map(str::to_owned));
    }

    /// Connect the selected adapter.
    ///
    /// Returns immediately when already connected, connecting or disconnecting.
    ///
    /// # Errors
    ///
    /// - [`WalletError::NotSelected`] when no wallet is selected
    /// - [`WalletError::NotReady`] when the wallet is not installed; the selection
    ///   is cleared and the wallet's URL is opened
    /// - [`WalletError::Adapter`] when the adapter rejects; the selection is cleared
    ///
    /// Every error is also broadcast on the error channel.
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let state = &inner.state;
        if state.connected.get() || state.connecting.get() || state.disconnecting.get() {
            return Ok(());
        }

        let (Some(wallet), Some(adapter)) = (state.wallet.get(), state.adapter.get()) else {
            return Err(inner.report(WalletError::NotSelected));
        };

        if !state.ready.get() {
            inner.selected_provider.set(None);
            if let Err(e) = inner.opener.open(&wallet.url) {
                warn!(url = %wallet.url, error = %e, "Failed to open wallet install page");
            }
            return Err(inner.report(WalletError::NotReady));
        }

        let Some(_busy) = BusyFlag::raise(inner, Operation::Connect) else {
            return Ok(());
        };

        debug!(adapter = adapter.name(), "Connecting wallet");
        match adapter.connect().await {
            Ok(()) => {
                inner.refresh_if_current(&adapter);
                info!(adapter = adapter.name(), public_key = ?state.public_key.get(), "Wallet connected");
                Ok(())
            }
            Err(e) => {
                inner.selected_provider.set(None);
                Err(inner.report(e.into()))
            }
        }
    }

    /// Disconnect the active adapter and clear the selection.
    ///
    /// Returns immediately while another disconnect is in flight. A connect in
    /// flight is awaited first, so `connecting` and `disconnecting` never
    /// overlap. The selection is cleared and `disconnecting` reset whether or not
    /// the adapter call succeeds; an adapter error is still returned.
    pub async fn disconnect(&self) -> Result<()> {
        let inner = &self.inner;
        let state = &inner.state;

        let (adapter, busy) = loop {
            if state.disconnecting.get() {
                return Ok(());
            }

            let Some(adapter) = state.adapter.get() else {
                inner.selected_provider.set(None);
                return Ok(());
            };

            if let Some(busy) = BusyFlag::raise(inner, Operation::Disconnect) {
                break (adapter, busy);
            }

            debug!(adapter = adapter.name(), "Waiting for in-flight connect before disconnecting");
            let mut connecting = state.connecting.watch();
            let _ = connecting.wait_for(|busy| !*busy).await;
            tokio::task::yield_now().await;
        };

        let result = adapter.disconnect().await;
        inner.selected_provider.set(None);
        drop(busy);

        match result {
            Ok(()) => {
                info!(adapter = adapter.name(), "Wallet disconnected");
                Ok(())
            }
            Err(e) => {
                warn!(adapter = adapter.name(), error = %e, "Wallet disconnect failed");
                Err(e.into())
            }
        }
    }

    /// Send a transaction through the connected adapter.
    ///
    /// Unlike the signing operations this always requires both a selected
    /// adapter and a connection.
    pub async fn send_transaction(
        &self,
        transaction: Transaction,
        connection: &RpcClient,
        options: SendTransactionOptions,
    ) -> Result<Signature> {
        let Some(adapter) = self.inner.state.adapter.get() else {
            return Err(self.inner.report(WalletError::NotSelected));
        };
        self.inner.ensure_connected()?;

        Ok(adapter.send_transaction(transaction, connection, options).await?)
    }

    /// Sign a transaction. `Ok(None)` when the wallet cannot sign transactions.
    pub async fn sign_transaction(&self, transaction: Transaction) -> Result<Option<Transaction>> {
        let Some(adapter) = self.inner.capable_adapter(Capability::SignTransaction) else {
            return Ok(None);
        };
        self.inner.ensure_connected()?;

        Ok(Some(adapter.sign_transaction(transaction).await?))
    }

    /// Sign several transactions. `Ok(None)` when unsupported.
    pub async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Option<Vec<Transaction>>> {
        let Some(adapter) = self.inner.capable_adapter(Capability::SignAllTransactions) else {
            return Ok(None);
        };
        self.inner.ensure_connected()?;

        Ok(Some(adapter.sign_all_transactions(transactions).await?))
    }

    /// Sign an arbitrary message. `Ok(None)` when unsupported.
    pub async fn sign_message(&self, message: &[u8]) -> Result<Option<Signature>> {
        let Some(adapter) = self.inner.capable_adapter(Capability::SignMessage) else {
            return Ok(None);
        };
        self.inner.ensure_connected()?;

        Ok(Some(adapter.sign_message(message).await?))
    }

    /// Release the adapter event subscriptions and stop rebinding them.
    ///
    /// Dropping the last session handle has the same effect.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        drop(self.inner.subscription.lock().take());
        debug!("Wallet session closed");
    }
}

impl SessionInner {
    /// Wire the reactive pieces: selection → derivation, adapter → event bridge,
    /// and the auto-connect triggers.
    fn install_watchers(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.selected_provider.observable().subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.derive();
            }
        });

        let weak = Arc::downgrade(self);
        self.state.adapter.subscribe(move |adapter| {
            if let Some(inner) = weak.upgrade() {
                bridge::rebind(&inner, adapter.as_ref());
            }
        });

        if self.auto_connect {
            self.state.adapter.subscribe(auto_connect_trigger(Arc::downgrade(self)));
            self.state.ready.subscribe(auto_connect_trigger(Arc::downgrade(self)));
            self.state.connected.subscribe(auto_connect_trigger(Arc::downgrade(self)));
            self.state.connecting.subscribe(auto_connect_trigger(Arc::downgrade(self)));
            self.state.disconnecting.subscribe(auto_connect_trigger(Arc::downgrade(self)));
        }
    }

    /// Recompute wallet, adapter and adapter-backed flags from the selection.
    fn derive(self: &Arc<Self>) {
        self.deriving.store(true, Ordering::SeqCst);

        let provider = self.selected_provider.get();
        let wallet = provider
            .as_deref()
            .and_then(|name| self.registry.get(name))
            .cloned();
        let adapter = wallet.as_ref().map(WalletDescriptor::adapter);

        debug!(
            provider = ?provider,
            wallet = ?wallet.as_ref().map(|w| w.name.as_str()),
            "Deriving wallet session state"
        );

        self.state.wallet.set(wallet);
        self.state.adapter.set(adapter.clone());

        match adapter {
            Some(_) => self.refresh_from_adapter(),
            None => {
                self.state.ready.set(false);
                self.state.public_key.set(None);
                self.state.connected.set(false);
            }
        }

        self.deriving.store(false, Ordering::SeqCst);
        auto_connect::check(self);
    }

    /// Copy `ready`, `public_key` and `connected` from the current adapter.
    ///
    /// `public_key` is only ever non-null while `connected` is true, including
    /// from the point of view of listeners on either cell.
    fn refresh_from_adapter(&self) {
        let Some(adapter) = self.state.adapter.get() else {
            return;
        };
        self.state.ready.set(adapter.ready());

        if adapter.connected() {
            self.state.connected.set(true);
            self.state.public_key.set(adapter.public_key());
        } else {
            self.state.public_key.set(None);
            self.state.connected.set(false);
        }
    }

    /// Refresh only if `adapter` is still the active one.
    fn refresh_if_current(&self, adapter: &AdapterHandle) {
        let current = self
            .state
            .adapter
            .with(|slot| slot.as_ref().is_some_and(|a| a.ptr_eq(adapter)));
        if current {
            self.refresh_from_adapter();
        }
    }

    fn busy_flag(&self, operation: Operation) -> &Observable<bool> {
        match operation {
            Operation::Connect => &self.state.connecting,
            Operation::Disconnect => &self.state.disconnecting,
        }
    }

    /// Claim the busy slot for `operation` and raise its flag.
    ///
    /// Fails while any operation holds the slot, so `connecting` and
    /// `disconnecting` are never true together.
    fn claim(&self, operation: Operation) -> bool {
        {
            let mut busy = self.busy.lock();
            if busy.is_some() {
                return false;
            }
            *busy = Some(operation);
        }
        self.busy_flag(operation).set(true);
        true
    }

    /// Lower the flag, free the slot, then re-run the auto-connect check that
    /// the flag change could not act on while the slot was still held.
    fn release(self: &Arc<Self>, operation: Operation) {
        self.busy_flag(operation).set(false);
        *self.busy.lock() = None;
        auto_connect::check(self);
    }

    fn capable_adapter(&self, capability: Capability) -> Option<AdapterHandle> {
        self.state
            .adapter
            .get()
            .filter(|adapter| adapter.supports(capability))
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state.connected.get() {
            Ok(())
        } else {
            Err(self.report(WalletError::NotConnected))
        }
    }

    /// Log and broadcast an error, returning it for the caller to propagate.
    fn report(&self, err: WalletError) -> WalletError {
        error!(error = %err, "Wallet error");
        // No subscribers is fine
        let _ = self.errors.send(err.clone());
        err
    }
}

fn auto_connect_trigger<T: 'static>(weak: Weak<SessionInner>) -> impl Fn(&T) + Send + Sync + 'static {
    move |_: &T| {
        if let Some(inner) = weak.upgrade() {
            auto_connect::check(&inner);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Connect,
    Disconnect,
}

/// Holds the busy slot and releases it on drop, including when the owning
/// future is cancelled mid-await.
struct BusyFlag<'a> {
    inner: &'a Arc<SessionInner>,
    operation: Operation,
}

impl<'a> BusyFlag<'a> {
    fn raise(inner: &'a Arc<SessionInner>, operation: Operation) -> Option<Self> {
        inner
            .claim(operation)
            .then_some(Self { inner, operation })
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.inner.release(self.operation);
    }
}
