//! # Wallet Session Utility
//!
//! Command-line front end for the wallet session store. The selected provider
//! is persisted under `WALLET_STORAGE_DIR`, so it survives between runs.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --package wallet-session --bin wallet_session -- wallets
//! cargo run --package wallet-session --bin wallet_session -- select Keypair
//! cargo run --package wallet-session --bin wallet_session -- sign-message "hello"
//! cargo run --package wallet-session --bin wallet_session -- status --json
//! ```

mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lib_wallet::{
    AdapterHandle, KeypairAdapter, KeypairSource, RpcClient, SessionConfig, WalletDescriptor,
    WalletRegistry, WalletSession,
};
use logging::LogFormat;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const KEYPAIR_WALLET: &str = "Keypair";
const SECRET_KEY_WALLET: &str = "Secret Key";
const KEYPAIR_DOCS_URL: &str = "https://docs.solanalabs.com/cli/wallets/file-system";
const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// How long to wait for a background auto-connect before running a command.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "wallet-session")]
#[command(about = "Select, connect and sign with Solana wallets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Override WALLET_STORAGE_DIR
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Override SOLANA_KEYPAIR_PATH
    #[arg(long, global = true)]
    keypair: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current session state
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported wallet providers
    Wallets,

    /// Select a wallet provider, or clear the selection when omitted
    Select {
        provider: Option<String>,
    },

    /// Connect the selected wallet
    Connect,

    /// Disconnect the selected wallet and clear the selection
    Disconnect,

    /// Sign a UTF-8 message with the selected wallet
    SignMessage {
        message: String,
    },

    /// Show the SOL balance of the selected wallet
    Balance,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    logging::init(cli.verbose, format);

    let mut config = SessionConfig::from_env()?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(path) = cli.keypair {
        config.keypair_path = path;
    }

    let session = WalletSession::from_config(&config, build_registry(&config))?;
    settle(&session).await;

    let result = run(&session, &config, cli.command).await;
    session.close();
    result
}

async fn run(session: &WalletSession, config: &SessionConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Status { json } => {
            let snapshot = session.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("Selected:     {}", snapshot.selected_provider.as_deref().unwrap_or("-"));
                println!("Ready:        {}", snapshot.ready);
                println!("Connected:    {}", snapshot.connected);
                println!("Public key:   {}", snapshot.public_key.as_deref().unwrap_or("-"));
                println!("Auto-connect: {}", session.auto_connect());
                let capabilities: Vec<String> =
                    snapshot.capabilities.iter().map(ToString::to_string).collect();
                println!("Capabilities: {}", capabilities.join(", "));
            }
        }

        Commands::Wallets => {
            let selected = session.selected_provider();
            for wallet in session.registry().wallets() {
                let marker = if selected.as_deref() == Some(wallet.name.as_str()) { "*" } else { " " };
                let status = if wallet.adapter().ready() { "ready" } else { "not installed" };
                println!("{marker} {:<12} {:<14} {}", wallet.name, status, wallet.url);
            }
        }

        Commands::Select { provider } => {
            session.select(provider.as_deref()).await;
            match session.selected_provider() {
                Some(name) => println!("Selected {name}."),
                None => println!("Selection cleared."),
            }
        }

        Commands::Connect => {
            session.connect().await?;
            match session.public_key() {
                Some(key) => println!("Connected: {key}"),
                None => println!("Connected."),
            }
        }

        Commands::Disconnect => {
            session.disconnect().await?;
            println!("Disconnected.");
        }

        Commands::SignMessage { message } => {
            session.connect().await?;
            match session.sign_message(message.as_bytes()).await? {
                Some(signature) => println!("{signature}"),
                None => println!("The selected wallet cannot sign messages."),
            }
        }

        Commands::Balance => {
            session.connect().await?;
            let Some(key) = session.public_key() else {
                anyhow::bail!("Wallet connected without a public key");
            };
            let client = RpcClient::new(config.rpc_url.clone());
            let lamports = client.get_balance(&key).await?;
            println!("{key}: {:.9} SOL", lamports as f64 / LAMPORTS_PER_SOL);
        }
    }

    Ok(())
}

/// Wallets this utility can drive: the configured keypair file, plus an
/// in-memory secret key when `WALLET_SECRET_KEY` is set.
fn build_registry(config: &SessionConfig) -> WalletRegistry {
    let file_adapter = Arc::new(KeypairAdapter::new(
        KEYPAIR_WALLET,
        KeypairSource::File(config.keypair_path.clone()),
    ));
    let mut wallets = vec![WalletDescriptor::new(
        KEYPAIR_WALLET,
        KEYPAIR_DOCS_URL,
        "",
        move || AdapterHandle::from(Arc::clone(&file_adapter)),
    )];

    if let Ok(secret) = env::var("WALLET_SECRET_KEY") {
        let secret_adapter = Arc::new(KeypairAdapter::new(SECRET_KEY_WALLET, KeypairSource::Base58(secret)));
        wallets.push(WalletDescriptor::new(
            SECRET_KEY_WALLET,
            KEYPAIR_DOCS_URL,
            "",
            move || AdapterHandle::from(Arc::clone(&secret_adapter)),
        ));
    }

    WalletRegistry::new(wallets)
}

/// Let a background auto-connect finish before issuing commands.
async fn settle(session: &WalletSession) {
    let mut connecting = session.state().connecting.watch();
    if tokio::time::timeout(SETTLE_TIMEOUT, connecting.wait_for(|busy| !*busy))
        .await
        .is_err()
    {
        warn!("Auto-connect still in progress");
    }
}
