//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use userop_relay::blockchain::types::{
    BlockchainResult, ChainReader, ReceiptStatus, TxSender,
};
use userop_relay::config::RelayConfig;
use userop_relay::http::{AppState, RpcServer};
use userop_relay::lifecycle::Shutdown;
use userop_relay::wallets::{BroadcastOptions, Broadcaster, TxMonitor, WalletEntry, WalletPool};

/// Chain reader with fixed balances and no indexed receipts.
pub struct FixedReader {
    balances: HashMap<Address, U256>,
}

#[async_trait]
impl ChainReader for FixedReader {
    async fn balance_of(&self, address: Address) -> BlockchainResult<U256> {
        Ok(self.balances.get(&address).copied().unwrap_or(U256::ZERO))
    }

    async fn receipt_status(&self, _hash: TxHash) -> BlockchainResult<Option<ReceiptStatus>> {
        Ok(None)
    }
}

/// Sender that accepts everything and returns a fixed hash.
pub struct FixedSender {
    pub hash: TxHash,
}

#[async_trait]
impl TxSender for FixedSender {
    async fn send(&self, _tx: &TransactionRequest) -> BlockchainResult<TxHash> {
        Ok(self.hash)
    }
}

/// The hash every relayed transaction resolves to in these tests.
pub fn relay_hash() -> TxHash {
    TxHash::from([0xab; 32])
}

/// Start a relay with two mock wallets on an ephemeral port.
///
/// Returns the full base URL of the JSON-RPC endpoint and the shutdown
/// handle keeping the server alive.
#[allow(dead_code)]
pub async fn start_relay(bundler_url: String) -> (String, Shutdown) {
    let config = RelayConfig::default();

    let rich = Address::from([0x11; 20]);
    let poor = Address::from([0x22; 20]);
    let reader: Arc<dyn ChainReader> = Arc::new(FixedReader {
        balances: HashMap::from([(rich, U256::from(100)), (poor, U256::from(1))]),
    });

    let pool = Arc::new(WalletPool::new(reader.clone()));
    let mut entries = vec![
        WalletEntry::new(rich, Arc::new(FixedSender { hash: relay_hash() })),
        WalletEntry::new(poor, Arc::new(FixedSender { hash: relay_hash() })),
    ]
    .into_iter();
    pool.load(vec!["k1".into(), "k2".into()], |_| {
        Ok(entries.next().unwrap())
    })
    .await
    .unwrap();
    pool.reorganize().await;

    let monitor = TxMonitor::new(reader, pool.clone());
    let broadcaster = Arc::new(Broadcaster::new(
        pool.clone(),
        monitor,
        BroadcastOptions {
            wait_for_confirmation: false,
            ..BroadcastOptions::default()
        },
    ));

    let state = AppState {
        pool,
        broadcaster,
        http: reqwest::Client::new(),
        entry_point: config.chain.entry_point.parse().unwrap(),
        bundler_url,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}{}", addr, config.base_path());

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = RpcServer::new(&config, state);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (base_url, shutdown)
}

/// Start a mock bundler that answers every request with a fixed JSON body.
#[allow(dead_code)]
pub async fn start_mock_bundler(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        // Drain the request before answering.
                        let mut buf = vec![0u8; 8192];
                        let _ = socket.read(&mut buf).await;

                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
