//! Signing wallet handles.
//!
//! # Security
//! - Private keys arrive only from the decrypted keystore
//! - Keys are never logged or serialized
//! - Each wallet gets its own signer-bound provider

use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::blockchain::types::{BlockchainError, BlockchainResult, TxSender};

/// A single signing wallet with its own RPC connection.
///
/// Signing happens locally; the provider fills nonce and gas fields and
/// submits the raw transaction.
pub struct SignerHandle {
    address: Address,
    provider: Arc<dyn Provider + Send + Sync>,
    timeout_duration: Duration,
}

impl SignerHandle {
    /// Build a handle from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `rpc_url` - Endpoint transactions are submitted through
    /// * `timeout_duration` - Per-send deadline
    pub fn connect(
        private_key_hex: &str,
        rpc_url: &Url,
        timeout_duration: Duration,
    ) -> BlockchainResult<Self> {
        let key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let address = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(rpc_url.clone());

        tracing::info!(address = %address, "Loaded relay wallet");

        Ok(Self {
            address,
            provider: Arc::new(provider),
            timeout_duration,
        })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl TxSender for SignerHandle {
    async fn send(&self, tx: &TransactionRequest) -> BlockchainResult<TxHash> {
        let fut = self.provider.send_transaction(tx.clone());
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(e)) => Err(BlockchainError::Rpc(format!(
                "Send from {} failed: {}",
                self.address, e
            ))),
            Err(_) => Err(BlockchainError::Timeout(self.timeout_duration.as_secs())),
        }
    }
}

impl std::fmt::Debug for SignerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerHandle")
            .field("address", &self.address)
            .finish()
    }
}
