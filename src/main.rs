//! UserOperation relay node.
//!
//! A bundler-style relay that accepts signed ERC-4337 user operations over
//! a JSON-RPC HTTP API and submits them on-chain through a pool of local
//! signing wallets.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────┐
//!                        │                 RELAY NODE                 │
//!                        │                                            │
//!   JSON-RPC request     │  ┌────────┐    ┌──────────┐   ┌─────────┐  │
//!   ─────────────────────┼─▶│  http  │───▶│ handlers │──▶│ wallets │  │
//!                        │  │ server │    │          │   │  pool + │  │
//!                        │  └────────┘    └────┬─────┘   │broadcast│  │
//!                        │                     │         └────┬────┘  │
//!                        │              forwarded to          │       │
//!                        │              upstream bundler      ▼       │
//!                        │                              ┌───────────┐ │
//!                        │                              │blockchain │─┼──▶ chain RPC
//!                        │                              │  client   │ │
//!                        │  ┌──────────────────────┐    └───────────┘ │
//!                        │  │ config · keystore ·  │                  │
//!                        │  │ observability · life │                  │
//!                        │  └──────────────────────┘                  │
//!                        └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use userop_relay::blockchain::{BlockchainClient, ChainReader, SignerHandle};
use userop_relay::config::load_config;
use userop_relay::http::{AppState, RpcServer};
use userop_relay::keystore;
use userop_relay::lifecycle::Shutdown;
use userop_relay::observability::metrics;
use userop_relay::wallets::{BroadcastOptions, Broadcaster, TxMonitor, WalletEntry, WalletPool};

#[derive(Parser)]
#[command(name = "userop-relay")]
#[command(about = "ERC-4337 UserOperation relay node", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "userop_relay={}",
                    config.observability.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("userop-relay v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chain_id = config.chain.chain_id,
        key_files = config.keystore.key_paths.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let client = BlockchainClient::new(config.chain.clone()).await?;
    let reader: Arc<dyn ChainReader> = Arc::new(client);

    // The unlock window starts at pool construction and covers the
    // operator password prompt below.
    let pool = Arc::new(WalletPool::new(reader.clone()));
    pool.clone()
        .spawn_unlock_watchdog(Duration::from_secs(config.keystore.unlock_timeout_secs));

    println!(
        "In order to load the wallets, please enter the security password. \
         This password is used to decrypt the private keys on boot-up, and \
         is not stored anywhere."
    );
    let password = rpassword::prompt_password("Enter the security password: ")?;

    let report = keystore::decrypt_all(&config.keystore.key_paths, &password);
    drop(password);
    tracing::info!(
        decrypted = report.keys.len(),
        failed = report.failures,
        "Keystore decryption finished"
    );

    let rpc_url: Url = config.chain.rpc_url.parse()?;
    let send_timeout = Duration::from_secs(config.chain.rpc_timeout_secs);
    pool.load(report.keys, |key| {
        SignerHandle::connect(key, &rpc_url, send_timeout).map(|handle| {
            let address = handle.address();
            WalletEntry::new(address, Arc::new(handle))
        })
    })
    .await?;
    pool.reorganize().await;

    let monitor = TxMonitor::new(reader, pool.clone());
    let broadcaster = Arc::new(Broadcaster::new(
        pool.clone(),
        monitor,
        BroadcastOptions::from(&config.broadcast),
    ));

    let state = AppState {
        pool,
        broadcaster,
        http: reqwest::Client::new(),
        entry_point: config.chain.entry_point.parse()?,
        bundler_url: config.chain.bundler_url.clone(),
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger();
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address).await?;
    let server = RpcServer::new(&config, state);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
