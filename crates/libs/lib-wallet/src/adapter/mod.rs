//! # Wallet Adapters
//!
//! The capability surface every wallet provider implements, plus the handle type the
//! session stores.
//!
//! ## Module Overview
//!
//! ```text
//! adapter/
//! ├── mod.rs       - WalletAdapter trait, events, capabilities, AdapterError
//! ├── emitter.rs   - EventEmitter helper for on/off/emit bookkeeping
//! └── keypair.rs   - KeypairAdapter (local keypair file or base58 secret)
//! ```
//!
//! ## Capabilities
//!
//! `connect`, `disconnect` and `send_transaction` are mandatory. The three signing
//! operations are optional: an adapter advertises them through
//! [`WalletAdapter::supports`], and the default trait methods return
//! [`AdapterError::Unsupported`].
//!
//! ## Events
//!
//! Adapters emit four lifecycle events ([`AdapterEventKind`]). Handlers are
//! registered per event with [`WalletAdapter::on`] and removed with
//! [`WalletAdapter::off`] using the returned [`HandlerId`].

pub mod emitter;
pub mod keypair;

pub use emitter::EventEmitter;
pub use keypair::{KeypairAdapter, KeypairSource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by wallet adapters.
///
/// The session passes these through to callers unchanged (wrapped in
/// [`WalletError::Adapter`](crate::error::WalletError::Adapter)).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("Wallet adapter not ready")]
    NotReady,

    #[error("Wallet adapter not connected")]
    NotConnected,

    #[error("Wallet connection error: {0}")]
    Connection(String),

    #[error("Wallet disconnection error: {0}")]
    Disconnection(String),

    #[error("Wallet keypair error: {0}")]
    Keypair(String),

    #[error("Sign transaction error: {0}")]
    SignTransaction(String),

    #[error("Sign message error: {0}")]
    SignMessage(String),

    #[error("Send transaction error: {0}")]
    SendTransaction(String),

    #[error("Wallet does not support {0}")]
    Unsupported(Capability),
}

/// Optional adapter operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    SignTransaction,
    SignAllTransactions,
    SignMessage,
}

impl Capability {
    pub fn all() -> &'static [Capability] {
        &[
            Capability::SignTransaction,
            Capability::SignAllTransactions,
            Capability::SignMessage,
        ]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::SignTransaction => "signTransaction",
            Capability::SignAllTransactions => "signAllTransactions",
            Capability::SignMessage => "signMessage",
        };
        f.write_str(name)
    }
}

/// Lifecycle event names an adapter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterEventKind {
    Ready,
    Connect,
    Disconnect,
    Error,
}

impl AdapterEventKind {
    pub fn all() -> &'static [AdapterEventKind] {
        &[
            AdapterEventKind::Ready,
            AdapterEventKind::Connect,
            AdapterEventKind::Disconnect,
            AdapterEventKind::Error,
        ]
    }
}

/// Lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// The wallet software became reachable
    Ready,
    /// A connection was established for the given account
    Connect(Pubkey),
    /// The connection ended
    Disconnect,
    /// The adapter hit an error outside of a direct call
    Error(AdapterError),
}

impl AdapterEvent {
    pub fn kind(&self) -> AdapterEventKind {
        match self {
            AdapterEvent::Ready => AdapterEventKind::Ready,
            AdapterEvent::Connect(_) => AdapterEventKind::Connect,
            AdapterEvent::Disconnect => AdapterEventKind::Disconnect,
            AdapterEvent::Error(_) => AdapterEventKind::Error,
        }
    }
}

/// Event callback registered on an adapter.
pub type EventHandler = Arc<dyn Fn(&AdapterEvent) + Send + Sync>;

/// Identifies a registered [`EventHandler`] so it can be removed with `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u64);

/// Options forwarded to the RPC node when sending a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionOptions {
    /// Skip the preflight simulation
    #[serde(default)]
    pub skip_preflight: bool,
    /// Maximum number of times the node retries sending the transaction
    pub max_retries: Option<usize>,
    /// Minimum slot the request may be evaluated at
    pub min_context_slot: Option<u64>,
}

/// A stateful connector to one wallet provider.
///
/// Implementations must not hold internal locks while emitting events: handlers
/// call back into `ready`, `public_key` and `connected`.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Provider name, used for logging.
    fn name(&self) -> &str;

    /// Whether the wallet software is installed and reachable.
    fn ready(&self) -> bool;

    /// Account exposed by the wallet once connected.
    fn public_key(&self) -> Option<Pubkey>;

    /// Whether an authorized session with the wallet exists.
    fn connected(&self) -> bool;

    /// Whether the adapter implements an optional operation.
    fn supports(&self, capability: Capability) -> bool;

    async fn connect(&self) -> Result<(), AdapterError>;

    async fn disconnect(&self) -> Result<(), AdapterError>;

    /// Sign (if needed) and submit a transaction through `connection`.
    async fn send_transaction(
        &self,
        transaction: Transaction,
        connection: &RpcClient,
        options: SendTransactionOptions,
    ) -> Result<Signature, AdapterError>;

    async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction, AdapterError> {
        Err(AdapterError::Unsupported(Capability::SignTransaction))
    }

    async fn sign_all_transactions(
        &self,
        _transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, AdapterError> {
        Err(AdapterError::Unsupported(Capability::SignAllTransactions))
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, AdapterError> {
        Err(AdapterError::Unsupported(Capability::SignMessage))
    }

    /// Register a handler for one event kind.
    fn on(&self, event: AdapterEventKind, handler: EventHandler) -> HandlerId;

    /// Remove a previously registered handler.
    fn off(&self, event: AdapterEventKind, id: HandlerId);
}

/// Shared handle to a live adapter instance.
///
/// Two handles are equal when they point at the same adapter instance, which is
/// what the session uses to detect an adapter switch.
#[derive(Clone)]
pub struct AdapterHandle(Arc<dyn WalletAdapter>);

impl AdapterHandle {
    pub fn new<A: WalletAdapter + 'static>(adapter: A) -> Self {
        Self(Arc::new(adapter))
    }

    pub fn ptr_eq(&self, other: &AdapterHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<A: WalletAdapter + 'static> From<Arc<A>> for AdapterHandle {
    fn from(adapter: Arc<A>) -> Self {
        Self(adapter)
    }
}

impl From<Arc<dyn WalletAdapter>> for AdapterHandle {
    fn from(adapter: Arc<dyn WalletAdapter>) -> Self {
        Self(adapter)
    }
}

impl Deref for AdapterHandle {
    type Target = dyn WalletAdapter;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl PartialEq for AdapterHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("name", &self.0.name())
            .field("ready", &self.0.ready())
            .field("connected", &self.0.connected())
            .finish()
    }
}
