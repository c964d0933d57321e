//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Decrypted keystore material
//!     → wallet.rs (signer handles, one provider per wallet)
//!     → client.rs (shared read client with failover + timeouts)
//!     → types.rs (errors + the ChainReader/TxSender seams the pool uses)
//! ```
//!
//! # Security Constraints
//! - Private keys only from the decrypted keystore
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use types::{BlockchainError, ChainConfig, ChainId, ChainReader, ReceiptStatus, TxSender};
pub use wallet::SignerHandle;
