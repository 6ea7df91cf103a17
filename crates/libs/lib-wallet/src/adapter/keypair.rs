//! # Keypair Adapter
//!
//! A wallet adapter backed by a local Solana keypair, for CLIs, bots and tests.
//!
//! ## Sources
//! - Keypair file in Solana CLI format (JSON byte array, 64 bytes)
//! - Keypair file or string containing a base58 encoded secret
//!
//! Both 32 byte secrets and 64 byte secret+public pairs are accepted. For 64 byte
//! input the embedded public key must match the derived one.
//!
//! The adapter is `ready` when its source is available (the file exists, or a
//! base58 string was supplied). Connecting loads the keypair into memory and emits
//! a `connect` event; disconnecting drops it.

use super::{
    AdapterError, AdapterEvent, AdapterEventKind, Capability, EventEmitter, EventHandler, HandlerId,
    SendTransactionOptions, WalletAdapter,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the keypair is loaded from on `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypairSource {
    /// Path to a keypair file (`~/` is expanded)
    File(PathBuf),
    /// Base58 encoded secret key
    Base58(String),
}

/// Wallet adapter signing with a local keypair.
pub struct KeypairAdapter {
    name: String,
    source: KeypairSource,
    keypair: RwLock<Option<Arc<Keypair>>>,
    events: EventEmitter,
}

impl KeypairAdapter {
    pub fn new(name: impl Into<String>, source: KeypairSource) -> Self {
        Self {
            name: name.into(),
            source,
            keypair: RwLock::new(None),
            events: EventEmitter::new(),
        }
    }

    /// Adapter for the Solana CLI default keypair (`~/.config/solana/id.json`).
    pub fn default_cli(name: impl Into<String>) -> Self {
        Self::new(
            name,
            KeypairSource::File(PathBuf::from("~/.config/solana/id.json")),
        )
    }

    pub fn source(&self) -> &KeypairSource {
        &self.source
    }

    fn loaded(&self) -> Result<Arc<Keypair>, AdapterError> {
        self.keypair
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(AdapterError::NotConnected)
    }

    async fn load(&self) -> Result<Keypair, AdapterError> {
        match &self.source {
            KeypairSource::File(path) => {
                let path = expand_home(path);
                let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    AdapterError::Keypair(format!("Failed to read {}: {}", path.display(), e))
                })?;
                parse_keypair(&contents)
            }
            KeypairSource::Base58(secret) => parse_keypair(secret),
        }
    }
}

#[async_trait]
impl WalletAdapter for KeypairAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn ready(&self) -> bool {
        match &self.source {
            KeypairSource::File(path) => expand_home(path).is_file(),
            KeypairSource::Base58(secret) => !secret.trim().is_empty(),
        }
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.keypair.read().as_ref().map(|kp| kp.pubkey())
    }

    fn connected(&self) -> bool {
        self.keypair.read().is_some()
    }

    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        if self.connected() {
            return Ok(());
        }
        if !self.ready() {
            return Err(AdapterError::NotReady);
        }

        let keypair = self.load().await?;
        let pubkey = keypair.pubkey();
        *self.keypair.write() = Some(Arc::new(keypair));

        info!(adapter = %self.name, public_key = %pubkey, "Keypair wallet connected");
        self.events.emit(&AdapterEvent::Connect(pubkey));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AdapterError> {
        let previous = self.keypair.write().take();
        if previous.is_some() {
            debug!(adapter = %self.name, "Keypair wallet disconnected");
            self.events.emit(&AdapterEvent::Disconnect);
        }
        Ok(())
    }

    async fn send_transaction(
        &self,
        mut transaction: Transaction,
        connection: &RpcClient,
        options: SendTransactionOptions,
    ) -> Result<Signature, AdapterError> {
        let keypair = self.loaded()?;

        let blockhash = if transaction.message.recent_blockhash == Hash::default() {
            connection.get_latest_blockhash().await.map_err(|e| {
                AdapterError::SendTransaction(format!("Failed to get blockhash: {}", e))
            })?
        } else {
            transaction.message.recent_blockhash
        };

        transaction
            .try_partial_sign(&[&*keypair], blockhash)
            .map_err(|e| AdapterError::SignTransaction(e.to_string()))?;

        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            max_retries: options.max_retries,
            min_context_slot: options.min_context_slot,
            ..RpcSendTransactionConfig::default()
        };

        connection
            .send_transaction_with_config(&transaction, config)
            .await
            .map_err(|e| AdapterError::SendTransaction(e.to_string()))
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction, AdapterError> {
        let keypair = self.loaded()?;
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&*keypair], blockhash)
            .map_err(|e| AdapterError::SignTransaction(e.to_string()))?;
        Ok(transaction)
    }

    async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, AdapterError> {
        let keypair = self.loaded()?;
        transactions
            .into_iter()
            .map(|mut transaction| -> Result<Transaction, AdapterError> {
                let blockhash = transaction.message.recent_blockhash;
                transaction
                    .try_partial_sign(&[&*keypair], blockhash)
                    .map_err(|e| AdapterError::SignTransaction(e.to_string()))?;
                Ok(transaction)
            })
            .collect()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, AdapterError> {
        let keypair = self.loaded()?;
        Ok(keypair.sign_message(message))
    }

    fn on(&self, event: AdapterEventKind, handler: EventHandler) -> HandlerId {
        self.events.on(event, handler)
    }

    fn off(&self, event: AdapterEventKind, id: HandlerId) {
        self.events.off(event, id)
    }
}

/// Expand a leading `~/` using `HOME` (or `USERPROFILE` on Windows).
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        Ok(home) => Path::new(&home).join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Parse a keypair from a JSON byte array or a base58 string.
fn parse_keypair(contents: &str) -> Result<Keypair, AdapterError> {
    let contents = contents.trim();
    let bytes: Vec<u8> = if contents.starts_with('[') {
        serde_json::from_str(contents)
            .map_err(|e| AdapterError::Keypair(format!("Invalid JSON format: {}", e)))?
    } else {
        bs58::decode(contents)
            .into_vec()
            .map_err(|e| AdapterError::Keypair(format!("Invalid base58: {}", e)))?
    };

    if bytes.len() != 32 && bytes.len() != 64 {
        return Err(AdapterError::Keypair(format!(
            "Expected 32 or 64 bytes, got {}",
            bytes.len()
        )));
    }

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&bytes[..32]);
    let keypair = Keypair::new_from_array(secret);

    if bytes.len() == 64 && keypair.pubkey().to_bytes()[..] != bytes[32..] {
        return Err(AdapterError::Keypair(
            "Public key does not match secret key".to_string(),
        ));
    }

    Ok(keypair)
}
