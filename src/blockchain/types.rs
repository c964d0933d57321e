//! Chain-specific types, error definitions, and the capability traits the
//! wallet pool is built against.

use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during chain operations.
#[derive(Debug, Clone, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for chain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Status of a mined transaction, as far as the relay cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Included and executed successfully.
    Success,
    /// Included but reverted.
    Reverted,
}

/// Read-only chain queries the wallet pool and monitor depend on.
///
/// The production implementation is [`BlockchainClient`]; tests substitute
/// scripted fakes.
///
/// [`BlockchainClient`]: crate::blockchain::client::BlockchainClient
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current balance of an address in wei.
    async fn balance_of(&self, address: Address) -> BlockchainResult<U256>;

    /// Receipt status for a transaction, `None` while it is not yet indexed.
    async fn receipt_status(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptStatus>>;
}

/// Send capability bound to a single signing wallet.
#[async_trait]
pub trait TxSender: Send + Sync {
    /// Sign and submit a transaction, returning its hash.
    async fn send(&self, tx: &TransactionRequest) -> BlockchainResult<TxHash>;
}
