//! Session configuration from environment variables.
//!
//! | Variable               | Default                      |
//! |------------------------|------------------------------|
//! | `WALLET_AUTO_CONNECT`  | `false`                      |
//! | `WALLET_STORAGE_KEY`   | `solana-wallet-provider`     |
//! | `WALLET_STORAGE_DIR`   | `.wallet`                    |
//! | `SOLANA_RPC_URL`       | `https://api.devnet.solana.com` |
//! | `SOLANA_KEYPAIR_PATH`  | `~/.config/solana/id.json`   |
//!
//! The file store under `WALLET_STORAGE_DIR` is read once at startup. Selection
//! changes written there by other processes only reach a running session through
//! [`WalletSession::refresh_selection`](crate::session::WalletSession::refresh_selection).

use crate::error::{Result, WalletError};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_STORAGE_KEY: &str = "solana-wallet-provider";
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Connect automatically whenever a ready adapter is selected
    pub auto_connect: bool,
    /// Store key holding the selected provider name
    pub storage_key: String,
    /// Directory of the file-backed store
    pub storage_dir: PathBuf,
    /// RPC endpoint used when sending transactions
    pub rpc_url: String,
    /// Keypair file for the built-in keypair wallet
    pub keypair_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_connect: false,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_dir: PathBuf::from(".wallet"),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            keypair_path: PathBuf::from("~/.config/solana/id.json"),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let auto_connect = match env::var("WALLET_AUTO_CONNECT") {
            Ok(value) => parse_bool(&value).ok_or_else(|| {
                WalletError::Config("WALLET_AUTO_CONNECT must be true/false or 1/0".to_string())
            })?,
            Err(_) => defaults.auto_connect,
        };

        let config = Self {
            auto_connect,
            storage_key: env::var("WALLET_STORAGE_KEY").unwrap_or(defaults.storage_key),
            storage_dir: env::var("WALLET_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            rpc_url: env::var("SOLANA_RPC_URL").unwrap_or(defaults.rpc_url),
            keypair_path: env::var("SOLANA_KEYPAIR_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.keypair_path),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(WalletError::Config("WALLET_STORAGE_KEY cannot be empty".to_string()));
        }
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(WalletError::Config(format!(
                "SOLANA_RPC_URL must be an http(s) URL, got {}",
                self.rpc_url
            )));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
