//! Transaction confirmation monitoring.
//!
//! # Responsibilities
//! - Poll the chain for a submitted transaction's receipt
//! - Back off exponentially while the receipt is not yet indexed
//! - Distinguish "reverted on-chain" from "status could not be determined"

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;

use crate::blockchain::types::{ChainReader, ReceiptStatus};
use crate::wallets::broadcast::BroadcastError;
use crate::wallets::pool::WalletPool;

/// Terminal outcome of monitoring one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Included and executed successfully.
    Confirmed,
    /// Included but reverted.
    Failed,
}

/// Polls receipts for broadcast attempts that opted into waiting.
#[derive(Clone)]
pub struct TxMonitor {
    reader: Arc<dyn ChainReader>,
    pool: Arc<WalletPool>,
}

impl TxMonitor {
    pub fn new(reader: Arc<dyn ChainReader>, pool: Arc<WalletPool>) -> Self {
        Self { reader, pool }
    }

    /// Wait until `hash` is confirmed or found failed on-chain.
    ///
    /// A missing receipt is transient: the poll is retried up to
    /// `max_retries` times with a delay that starts at `initial_delay` and
    /// doubles after each miss. Exhausting the budget yields
    /// [`BroadcastError::ConfirmationUnknown`], which is a different fact
    /// than the transaction having failed. Any other query error is
    /// terminal and not retried.
    ///
    /// Either terminal receipt triggers an asynchronous pool
    /// reorganization, since a mined transaction moved balances.
    pub async fn confirm(
        &self,
        hash: TxHash,
        max_retries: u32,
        initial_delay: Duration,
    ) -> Result<ConfirmationStatus, BroadcastError> {
        let mut retries = 0;
        let mut delay = initial_delay;

        tracing::debug!(hash = %hash, "Monitoring transaction");

        while retries < max_retries {
            match self.reader.receipt_status(hash).await {
                Ok(Some(ReceiptStatus::Success)) => {
                    tracing::info!(hash = %hash, "Transaction confirmed");
                    self.spawn_reorganize();
                    return Ok(ConfirmationStatus::Confirmed);
                }
                Ok(Some(ReceiptStatus::Reverted)) => {
                    tracing::warn!(hash = %hash, "Transaction failed on-chain");
                    self.spawn_reorganize();
                    return Ok(ConfirmationStatus::Failed);
                }
                Ok(None) => {
                    retries += 1;
                    if retries >= max_retries {
                        break;
                    }
                    tracing::debug!(
                        hash = %hash,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Receipt not found yet"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::warn!(hash = %hash, error = %e, "Receipt query failed");
                    return Err(BroadcastError::Receipt(e));
                }
            }
        }

        Err(BroadcastError::ConfirmationUnknown {
            hash,
            attempts: max_retries,
        })
    }

    fn spawn_reorganize(&self) {
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            pool.reorganize().await;
        });
    }
}
