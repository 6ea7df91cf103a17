//! # Wallet Registry
//!
//! The fixed, ordered list of wallet providers an application supports.
//!
//! Each [`WalletDescriptor`] names a provider, links to its installation page and
//! knows how to build a fresh adapter for it. The registry is built once and never
//! mutated; the session looks providers up by name.
//!
//! ## Example
//!
//! ```rust
//! use lib_wallet::adapter::{AdapterHandle, KeypairAdapter};
//! use lib_wallet::registry::{WalletDescriptor, WalletRegistry};
//!
//! let registry = WalletRegistry::new(vec![WalletDescriptor::new(
//!     "Keypair",
//!     "https://docs.solanalabs.com/cli/wallets/file-system",
//!     "",
//!     || AdapterHandle::new(KeypairAdapter::default_cli("Keypair")),
//! )]);
//!
//! assert!(registry.get("Keypair").is_some());
//! assert!(registry.get("Phantom").is_none());
//! ```

use crate::adapter::AdapterHandle;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a new adapter instance for a provider.
pub type AdapterFactory = Arc<dyn Fn() -> AdapterHandle + Send + Sync>;

/// Immutable description of one supported wallet provider.
#[derive(Clone, Serialize)]
pub struct WalletDescriptor {
    /// Provider identity, the key persisted as the selected provider
    pub name: String,
    /// Installation / homepage URL, opened when the wallet is not ready
    pub url: String,
    /// Icon URL or data URI
    pub icon: String,
    #[serde(skip)]
    factory: AdapterFactory,
}

impl WalletDescriptor {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        icon: impl Into<String>,
        factory: impl Fn() -> AdapterHandle + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            icon: icon.into(),
            factory: Arc::new(factory),
        }
    }

    /// Build an adapter for this provider.
    pub fn adapter(&self) -> AdapterHandle {
        (self.factory)()
    }
}

/// Descriptors compare by identity fields; the factory is not comparable.
impl PartialEq for WalletDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.url == other.url && self.icon == other.icon
    }
}

impl fmt::Debug for WalletDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletDescriptor")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}

/// Ordered provider list plus a by-name index.
#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    wallets: Arc<Vec<WalletDescriptor>>,
    by_provider: Arc<HashMap<String, WalletDescriptor>>,
}

impl WalletRegistry {
    /// Build a registry. When two descriptors share a name the later one wins the
    /// lookup, but both stay in the ordered list.
    pub fn new(wallets: Vec<WalletDescriptor>) -> Self {
        let by_provider = wallets.iter().fold(HashMap::new(), |mut map, wallet| {
            map.insert(wallet.name.clone(), wallet.clone());
            map
        });

        Self {
            wallets: Arc::new(wallets),
            by_provider: Arc::new(by_provider),
        }
    }

    pub fn get(&self, name: &str) -> Option<&WalletDescriptor> {
        self.by_provider.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_provider.contains_key(name)
    }

    /// Providers in registration order.
    pub fn wallets(&self) -> &[WalletDescriptor] {
        &self.wallets
    }

    /// Mapping of provider identity to descriptor.
    pub fn wallets_by_provider(&self) -> &HashMap<String, WalletDescriptor> {
        &self.by_provider
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}
