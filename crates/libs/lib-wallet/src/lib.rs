//! # Wallet Session Library
//!
//! Connection-state manager for Solana wallet adapters.
//!
//! A [`WalletSession`] remembers which wallet provider the user picked, mirrors
//! that wallet's lifecycle (ready / connecting / connected / disconnecting) and
//! forwards signing and sending calls to whichever adapter is active.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    WalletSession                       │
//! │                                                        │
//! │  selected_provider ──▶ wallet ──▶ adapter ──▶ flags    │
//! │        ▲                             │                 │
//! │        │                             │ on/off events   │
//! └────────┼─────────────────────────────┼─────────────────┘
//!          │                             ▼
//! ┌─────────────────┐          ┌─────────────────────────┐
//! │ KeyValueStore   │          │ WalletAdapter           │
//! │ (memory / file) │          │ (keypair, extension...) │
//! └─────────────────┘          └─────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - **session**: the session store and its actions
//! - **adapter**: adapter trait, events, capabilities, built-in keypair adapter
//! - **registry**: supported wallet providers
//! - **storage**: persisted provider selection
//! - **observable**: reactive value cells backing every session field
//! - **opener**: opening wallet install pages
//! - **config**: environment-driven configuration
//! - **error**: error types

pub mod adapter;
pub mod config;
pub mod error;
pub mod observable;
pub mod opener;
pub mod registry;
pub mod session;
pub mod storage;

// Re-export commonly used types from root for convenience
pub use adapter::{
    AdapterError, AdapterEvent, AdapterEventKind, AdapterHandle, Capability, EventEmitter,
    EventHandler, HandlerId, KeypairAdapter, KeypairSource, SendTransactionOptions, WalletAdapter,
};
pub use config::SessionConfig;
pub use error::{Result, StorageError, WalletError};
pub use observable::{ListenerId, Observable};
pub use opener::{BrowserOpener, NoopOpener, UrlOpener};
pub use registry::{WalletDescriptor, WalletRegistry};
pub use session::{SessionSnapshot, SessionState, WalletSession};
pub use storage::{FileStore, KeyValueStore, MemoryStore, PersistedValue};

pub use solana_client::nonblocking::rpc_client::RpcClient;
pub use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
