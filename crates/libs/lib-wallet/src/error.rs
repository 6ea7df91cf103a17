//! # Wallet Session Errors
//!
//! Error types for the wallet session store, built with `thiserror`.
//!
//! ## Error Categories
//!
//! - **Precondition errors** raised by the session itself:
//!   [`NotSelected`](WalletError::NotSelected), [`NotReady`](WalletError::NotReady),
//!   [`NotConnected`](WalletError::NotConnected)
//! - **Adapter errors** raised by the active wallet adapter and passed through
//!   unchanged ([`WalletError::Adapter`])
//! - **Storage errors** from the persisted provider selection ([`StorageError`])
//! - **Configuration errors** while loading [`SessionConfig`](crate::config::SessionConfig)
//!
//! All errors are `Clone` so they can be broadcast on the session error channel
//! (see [`WalletSession::subscribe_errors`](crate::session::WalletSession::subscribe_errors)).

use crate::adapter::AdapterError;
use thiserror::Error;

/// Convenience type alias for `Result<T, WalletError>`.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Session-level error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// No wallet provider is selected, or the selection is not in the registry.
    #[error("Wallet not selected")]
    NotSelected,

    /// The selected wallet is not installed or not reachable.
    ///
    /// Raising this clears the persisted selection and opens the wallet's
    /// installation page.
    #[error("Wallet not ready")]
    NotReady,

    /// The operation requires an active connection.
    #[error("Wallet not connected")]
    NotConnected,

    /// Error raised by the wallet adapter.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Error reading or writing the persisted provider selection.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid session configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors from a [`KeyValueStore`](crate::storage::KeyValueStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Stored data could not be encoded or decoded
    #[error("Storage format error: {0}")]
    Format(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Format(err.to_string())
    }
}
