//! Shared test doubles for the wallet session integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lib_wallet::{
    AdapterError, AdapterEvent, AdapterEventKind, AdapterHandle, Capability, EventEmitter,
    EventHandler, HandlerId, KeyValueStore, MemoryStore, Observable, PersistedValue, Pubkey,
    SendTransactionOptions, Signature, StorageError, Transaction, UrlOpener, WalletAdapter,
    WalletDescriptor, WalletRegistry, WalletSession,
};
use parking_lot::Mutex;
use solana_client::nonblocking::rpc_client::RpcClient;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const STORAGE_KEY: &str = "solana-wallet-provider";

// ========== Mock Adapter ==========

struct MockState {
    ready: bool,
    connected: bool,
    public_key: Pubkey,
    connect_error: Option<AdapterError>,
    disconnect_error: Option<AdapterError>,
}

/// Scriptable adapter that counts every call made to it.
pub struct MockAdapter {
    name: String,
    state: Mutex<MockState>,
    capabilities: Vec<Capability>,
    events: EventEmitter,
    connect_gate: Mutex<Option<Arc<Notify>>>,
    disconnect_gate: Mutex<Option<Arc<Notify>>>,
    pub on_calls: AtomicUsize,
    pub off_calls: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
}

impl MockAdapter {
    /// Ready adapter supporting every optional capability.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(MockState {
                ready: true,
                connected: false,
                public_key: Pubkey::new_unique(),
                connect_error: None,
                disconnect_error: None,
            }),
            capabilities: Capability::all().to_vec(),
            events: EventEmitter::new(),
            connect_gate: Mutex::new(None),
            disconnect_gate: Mutex::new(None),
            on_calls: AtomicUsize::new(0),
            off_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
        }
    }

    pub fn not_ready(self) -> Self {
        self.state.lock().ready = false;
        self
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn failing_connect(self, error: AdapterError) -> Self {
        self.state.lock().connect_error = Some(error);
        self
    }

    pub fn failing_disconnect(self, error: AdapterError) -> Self {
        self.state.lock().disconnect_error = Some(error);
        self
    }

    pub fn key(&self) -> Pubkey {
        self.state.lock().public_key
    }

    /// Make the wallet reachable and announce it.
    pub fn become_ready(&self) {
        self.state.lock().ready = true;
        self.events.emit(&AdapterEvent::Ready);
    }

    /// Mark connected without going through `connect`, as an extension would
    /// after the user approves in its own popup.
    pub fn connect_externally(&self) {
        let key = {
            let mut state = self.state.lock();
            state.connected = true;
            state.public_key
        };
        self.events.emit(&AdapterEvent::Connect(key));
    }

    pub fn emit(&self, event: AdapterEvent) {
        self.events.emit(&event);
    }

    /// Hold every following `connect` until the returned gate is notified.
    pub fn gate_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.connect_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn gate_disconnect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.disconnect_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Handlers currently registered across all four events.
    pub fn active_handlers(&self) -> usize {
        AdapterEventKind::all()
            .iter()
            .map(|kind| self.events.listener_count(*kind))
            .sum()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn ready(&self) -> bool {
        self.state.lock().ready
    }

    fn public_key(&self) -> Option<Pubkey> {
        let state = self.state.lock();
        state.connected.then_some(state.public_key)
    }

    fn connected(&self) -> bool {
        self.state.lock().connected
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.connect_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let outcome = {
            let mut state = self.state.lock();
            match state.connect_error.clone() {
                Some(error) => Err(error),
                None => {
                    state.connected = true;
                    Ok(state.public_key)
                }
            }
        };

        let key = outcome?;
        self.events.emit(&AdapterEvent::Connect(key));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AdapterError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.disconnect_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let error = {
            let mut state = self.state.lock();
            state.connected = false;
            state.disconnect_error.clone()
        };
        self.events.emit(&AdapterEvent::Disconnect);

        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn send_transaction(
        &self,
        _transaction: Transaction,
        _connection: &RpcClient,
        _options: SendTransactionOptions,
    ) -> Result<Signature, AdapterError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Signature::from([7u8; 64]))
    }

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction, AdapterError> {
        Ok(transaction)
    }

    async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, AdapterError> {
        Ok(transactions)
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, AdapterError> {
        Ok(Signature::from([1u8; 64]))
    }

    fn on(&self, event: AdapterEventKind, handler: EventHandler) -> HandlerId {
        self.on_calls.fetch_add(1, Ordering::SeqCst);
        self.events.on(event, handler)
    }

    fn off(&self, event: AdapterEventKind, id: HandlerId) {
        self.off_calls.fetch_add(1, Ordering::SeqCst);
        self.events.off(event, id)
    }
}

// ========== Store & Opener ==========

/// Memory store that counts writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}

/// Opener that records URLs instead of launching a browser.
#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

// ========== Fixture ==========

pub struct Fixture {
    pub session: WalletSession,
    pub store: Arc<CountingStore>,
    pub opener: Arc<RecordingOpener>,
    pub adapters: HashMap<String, Arc<MockAdapter>>,
}

impl Fixture {
    pub fn adapter(&self, name: &str) -> &Arc<MockAdapter> {
        &self.adapters[name]
    }

    /// Value currently held by the backing store, bypassing the session.
    pub fn stored_provider(&self) -> Option<String> {
        self.store.get(STORAGE_KEY).unwrap()
    }
}

pub fn install_url(name: &str) -> String {
    format!("https://{}.example/install", name.to_lowercase())
}

/// Registry whose factories always hand out the given adapter instances.
pub fn registry_of(adapters: &HashMap<String, Arc<MockAdapter>>, order: &[&str]) -> WalletRegistry {
    WalletRegistry::new(
        order
            .iter()
            .map(|name| {
                let adapter = Arc::clone(&adapters[*name]);
                WalletDescriptor::new(*name, install_url(name), "", move || {
                    AdapterHandle::from(Arc::clone(&adapter))
                })
            })
            .collect(),
    )
}

pub fn fixture(adapters: Vec<MockAdapter>, initial: Option<&str>, auto_connect: bool) -> Fixture {
    let order: Vec<String> = adapters.iter().map(|a| a.name().to_string()).collect();
    let adapters: HashMap<String, Arc<MockAdapter>> = adapters
        .into_iter()
        .map(|adapter| (adapter.name().to_string(), Arc::new(adapter)))
        .collect();
    let order: Vec<&str> = order.iter().map(String::as_str).collect();
    let registry = registry_of(&adapters, &order);

    let store = Arc::new(CountingStore::default());
    if let Some(name) = initial {
        store.inner.set(STORAGE_KEY, Some(name)).unwrap();
    }

    let opener = Arc::new(RecordingOpener::default());
    let persisted = PersistedValue::new(Arc::clone(&store) as Arc<dyn KeyValueStore>, STORAGE_KEY);
    let session = WalletSession::with_opener(
        registry,
        persisted,
        auto_connect,
        Arc::clone(&opener) as Arc<dyn UrlOpener>,
    );

    Fixture {
        session,
        store,
        opener,
        adapters,
    }
}

pub fn rpc_client() -> RpcClient {
    RpcClient::new("http://127.0.0.1:8899".to_string())
}

/// Wait (bounded) until `cell` satisfies `predicate`.
pub async fn wait_for<T>(cell: &Observable<T>, predicate: impl FnMut(&T) -> bool)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let mut rx = cell.watch();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("observable dropped");
}

/// Records whether `connecting` and `disconnecting` were ever observed true at
/// the same time, from listeners on both cells.
pub fn track_busy_overlap(session: &WalletSession) -> Arc<AtomicBool> {
    let overlap = Arc::new(AtomicBool::new(false));
    let state = session.state();

    let seen = Arc::clone(&overlap);
    let disconnecting = state.disconnecting.clone();
    state.connecting.subscribe(move |connecting| {
        if *connecting && disconnecting.get() {
            seen.store(true, Ordering::SeqCst);
        }
    });

    let seen = Arc::clone(&overlap);
    let connecting = state.connecting.clone();
    state.disconnecting.subscribe(move |disconnecting| {
        if *disconnecting && connecting.get() {
            seen.store(true, Ordering::SeqCst);
        }
    });

    overlap
}
