//! Redundant transaction broadcasting.
//!
//! # Responsibilities
//! - Select the best-funded wallets for a submission
//! - Run one send attempt per wallet concurrently
//! - Arbitrate the race so exactly one outcome is reported
//!
//! A broadcast launches `redundancy` concurrent attempts, each with its own
//! bounded retry budget. The attempts share a per-call success flag behind
//! a mutex: before every send, and after every failure, an attempt checks
//! whether a sibling already won and abandons itself if so. Abandonment is
//! not cancellation; an in-flight send runs to completion and only its
//! result is discarded.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use alloy::rpc::types::TransactionRequest;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blockchain::types::BlockchainError;
use crate::config::BroadcastConfig;
use crate::observability::metrics;
use crate::wallets::monitor::{ConfirmationStatus, TxMonitor};
use crate::wallets::pool::{WalletEntry, WalletPool};

/// Errors a broadcast call can report.
#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    /// The pool has not been unlocked; broadcasting is not allowed yet.
    #[error("wallet pool is not unlocked")]
    PoolLocked,

    /// The pool holds no wallets.
    #[error("no wallets loaded")]
    PoolEmpty,

    /// A send attempt failed at the RPC layer.
    #[error("transaction send failed: {0}")]
    Send(BlockchainError),

    /// A receipt query failed while monitoring.
    #[error("receipt query failed: {0}")]
    Receipt(BlockchainError),

    /// The transaction was included but reverted.
    #[error("transaction {hash} failed on-chain")]
    Reverted { hash: TxHash },

    /// The monitor ran out of polls without finding a receipt.
    #[error("confirmation status of {hash} unknown after {attempts} polls")]
    ConfirmationUnknown { hash: TxHash, attempts: u32 },

    /// Every attempt exhausted its budget without recording a cause.
    #[error("all transaction attempts failed")]
    AllAttemptsFailed,
}

/// Per-call knobs for a broadcast.
#[derive(Debug, Clone)]
pub struct BroadcastOptions {
    /// Number of wallets to submit through concurrently.
    pub redundancy: usize,
    /// Treat "confirmed" rather than "sent" as the success criterion.
    pub wait_for_confirmation: bool,
    /// Maximum send attempts per wallet.
    pub max_retries: u32,
    /// Delay before the first send retry, doubled each retry.
    pub initial_backoff: Duration,
    /// Maximum receipt polls when waiting for confirmation.
    pub monitor_max_retries: u32,
    /// Delay before the first receipt re-poll, doubled each poll.
    pub monitor_initial_delay: Duration,
}

impl From<&BroadcastConfig> for BroadcastOptions {
    fn from(config: &BroadcastConfig) -> Self {
        Self {
            redundancy: config.redundancy,
            wait_for_confirmation: config.wait_for_confirmation,
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            monitor_max_retries: config.monitor_max_retries,
            monitor_initial_delay: Duration::from_millis(config.monitor_initial_delay_ms),
        }
    }
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self::from(&BroadcastConfig::default())
    }
}

/// State shared by the attempts of one broadcast call.
#[derive(Default)]
struct SharedOutcome {
    succeeded: bool,
    first_error: Option<BroadcastError>,
    result_hash: Option<TxHash>,
}

/// Final result of a single wallet's attempt.
struct AttemptOutcome {
    success: bool,
    hash: Option<TxHash>,
    error: Option<BroadcastError>,
}

impl AttemptOutcome {
    fn succeeded(hash: TxHash) -> Self {
        Self {
            success: true,
            hash: Some(hash),
            error: None,
        }
    }

    fn failed(error: BroadcastError) -> Self {
        Self {
            success: false,
            hash: None,
            error: Some(error),
        }
    }

    /// A sibling attempt won; this one carries no result and no error.
    fn abandoned() -> Self {
        Self {
            success: false,
            hash: None,
            error: None,
        }
    }
}

/// Submits one logical transaction through several wallets at once.
pub struct Broadcaster {
    pool: Arc<WalletPool>,
    monitor: TxMonitor,
    defaults: BroadcastOptions,
}

impl Broadcaster {
    pub fn new(pool: Arc<WalletPool>, monitor: TxMonitor, defaults: BroadcastOptions) -> Self {
        Self {
            pool,
            monitor,
            defaults,
        }
    }

    /// Broadcast with the configured defaults.
    pub async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, BroadcastError> {
        self.broadcast(tx, self.defaults.clone()).await
    }

    /// Broadcast `tx` through the `redundancy` best-funded wallets.
    ///
    /// Exactly one hash is returned even when several sends land on-chain;
    /// ties are resolved deterministically by attempt launch order. If no
    /// attempt succeeds, the first error in launch order is surfaced.
    pub async fn broadcast(
        &self,
        tx: TransactionRequest,
        opts: BroadcastOptions,
    ) -> Result<TxHash, BroadcastError> {
        if !self.pool.is_unlocked() {
            return Err(BroadcastError::PoolLocked);
        }

        let selected = self.pool.top_wallets(opts.redundancy.max(1)).await;
        if selected.is_empty() {
            return Err(BroadcastError::PoolEmpty);
        }

        tracing::debug!(
            wallets = selected.len(),
            wait = opts.wait_for_confirmation,
            "Broadcasting transaction"
        );

        let shared = Arc::new(Mutex::new(SharedOutcome::default()));
        let mut handles = Vec::with_capacity(selected.len());
        for entry in selected {
            let tx = tx.clone();
            let shared = Arc::clone(&shared);
            let monitor = self.monitor.clone();
            let opts = opts.clone();
            handles.push(tokio::spawn(attempt(entry, tx, shared, monitor, opts)));
        }

        // Launch order is preserved here regardless of completion order.
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.unwrap_or_else(|e| {
                AttemptOutcome::failed(BroadcastError::Send(BlockchainError::Rpc(format!(
                    "attempt task failed: {e}"
                ))))
            }));
        }

        let mut winner = results
            .iter()
            .find(|r| r.success && r.hash.is_some())
            .and_then(|r| r.hash);
        if winner.is_none() {
            // An attempt task can die between marking success and returning;
            // the shared state still holds the hash it stored.
            winner = shared.lock().await.result_hash;
        }

        if let Some(hash) = winner {
            if !opts.wait_for_confirmation {
                // The debit is pending but observable; fold it into the
                // ordering without holding up the caller.
                let pool = Arc::clone(&self.pool);
                tokio::spawn(async move {
                    pool.reorganize().await;
                });
            }
            metrics::record_broadcast_outcome("success");
            tracing::info!(hash = %hash, "Transaction broadcast succeeded");
            return Ok(hash);
        }

        metrics::record_broadcast_outcome("failure");

        for result in &mut results {
            if let Some(error) = result.error.take() {
                return Err(error);
            }
        }

        let first_error = shared.lock().await.first_error.take();
        Err(first_error.unwrap_or(BroadcastError::AllAttemptsFailed))
    }
}

/// One wallet's attempt loop.
async fn attempt(
    entry: WalletEntry,
    tx: TransactionRequest,
    shared: Arc<Mutex<SharedOutcome>>,
    monitor: TxMonitor,
    opts: BroadcastOptions,
) -> AttemptOutcome {
    let mut retries: u32 = 0;
    let mut delay = opts.initial_backoff;

    loop {
        // A sibling may already have won; stop scheduling work for this one.
        if shared.lock().await.succeeded {
            return AttemptOutcome::abandoned();
        }

        tracing::debug!(wallet = %entry.address(), "Sending transaction");
        match entry.sender().send(&tx).await {
            Ok(hash) => {
                metrics::record_send_attempt(true);

                if !opts.wait_for_confirmation {
                    let mut state = shared.lock().await;
                    state.succeeded = true;
                    state.result_hash = Some(hash);
                    return AttemptOutcome::succeeded(hash);
                }

                match monitor
                    .confirm(hash, opts.monitor_max_retries, opts.monitor_initial_delay)
                    .await
                {
                    Ok(ConfirmationStatus::Confirmed) => {
                        let mut state = shared.lock().await;
                        state.succeeded = true;
                        state.result_hash = Some(hash);
                        return AttemptOutcome::succeeded(hash);
                    }
                    Ok(ConfirmationStatus::Failed) => {
                        // Resending a reverted transaction cannot change the
                        // outcome; this attempt is done.
                        let error = BroadcastError::Reverted { hash };
                        note_error(&shared, &error).await;
                        return AttemptOutcome::failed(error);
                    }
                    Err(error) => {
                        note_error(&shared, &error).await;
                        return AttemptOutcome::failed(error);
                    }
                }
            }
            Err(send_error) => {
                metrics::record_send_attempt(false);
                let error = BroadcastError::Send(send_error);
                if note_error(&shared, &error).await {
                    return AttemptOutcome::abandoned();
                }

                retries += 1;
                if retries >= opts.max_retries {
                    tracing::warn!(
                        wallet = %entry.address(),
                        error = %error,
                        "Send attempts exhausted"
                    );
                    return AttemptOutcome::failed(error);
                }

                tracing::debug!(
                    wallet = %entry.address(),
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying send"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

/// Record `error` as the call's first error unless a sibling already won.
/// Returns true if the attempt should abandon instead.
async fn note_error(shared: &Mutex<SharedOutcome>, error: &BroadcastError) -> bool {
    let mut state = shared.lock().await;
    if state.succeeded {
        return true;
    }
    if state.first_error.is_none() {
        state.first_error = Some(error.clone());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallets::testutil::{entry_with, ScriptedReader, ScriptedSender};
    use alloy::primitives::U256;

    async fn pool_with(entries: Vec<WalletEntry>) -> Arc<WalletPool> {
        let pool = Arc::new(WalletPool::new(Arc::new(ScriptedReader::default())));
        let keys: Vec<String> = (0..entries.len()).map(|i| format!("k{i}")).collect();
        let mut iter = entries.into_iter();
        pool.load(keys, |_| Ok(iter.next().unwrap())).await.unwrap();
        pool
    }

    fn broadcaster_for(pool: Arc<WalletPool>) -> Broadcaster {
        let reader = Arc::new(ScriptedReader::default());
        let monitor = TxMonitor::new(reader, pool.clone());
        Broadcaster::new(pool, monitor, BroadcastOptions::default())
    }

    fn broadcaster_with_reader(pool: Arc<WalletPool>, reader: Arc<ScriptedReader>) -> Broadcaster {
        let monitor = TxMonitor::new(reader, pool.clone());
        Broadcaster::new(pool, monitor, BroadcastOptions::default())
    }

    fn no_wait(redundancy: usize, max_retries: u32) -> BroadcastOptions {
        BroadcastOptions {
            redundancy,
            wait_for_confirmation: false,
            max_retries,
            initial_backoff: Duration::from_secs(1),
            ..BroadcastOptions::default()
        }
    }

    #[tokio::test]
    async fn test_locked_pool_rejects_broadcast() {
        let pool = Arc::new(WalletPool::new(Arc::new(ScriptedReader::default())));
        let broadcaster = broadcaster_for(pool);

        let result = broadcaster
            .broadcast(TransactionRequest::default(), no_wait(2, 1))
            .await;
        assert!(matches!(result, Err(BroadcastError::PoolLocked)));
    }

    #[tokio::test]
    async fn test_redundancy_is_capped_by_pool_size() {
        let hash = TxHash::from([1u8; 32]);
        let senders: Vec<_> = (0..3).map(|_| ScriptedSender::new(vec![Ok(hash)])).collect();
        let entries = senders
            .iter()
            .enumerate()
            .map(|(i, s)| entry_with([i as u8 + 1; 20], s.clone()).0)
            .collect();

        let pool = pool_with(entries).await;
        let broadcaster = broadcaster_for(pool);

        let result = broadcaster
            .broadcast(TransactionRequest::default(), no_wait(5, 1))
            .await;
        assert_eq!(result.unwrap(), hash);

        // Five requested, three exist: every wallet sent at most once.
        for sender in &senders {
            assert!(sender.calls() <= 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loser_budget_exhaustion_does_not_mask_winner() {
        let hash_b = TxHash::from([0xbb; 32]);
        let err = || crate::blockchain::BlockchainError::Rpc("insufficient funds".into());
        let sender_a = ScriptedSender::new(vec![Err(err()), Err(err())]);
        let sender_b = ScriptedSender::new(vec![Ok(hash_b)]);
        // B lands only after A has burned through its whole retry budget.
        sender_b.set_delay(Duration::from_secs(3));

        let (a, _) = entry_with([0xaa; 20], sender_a.clone());
        let (b, _) = entry_with([0xbb; 20], sender_b.clone());
        let pool = pool_with(vec![a, b]).await;
        let broadcaster = broadcaster_for(pool);

        let result = broadcaster
            .broadcast(TransactionRequest::default(), no_wait(2, 2))
            .await;

        // A failed twice and exhausted its budget; B's hash still wins and
        // A's error is not surfaced.
        assert_eq!(result.unwrap(), hash_b);
        assert_eq!(sender_a.calls(), 2);
        assert_eq!(sender_b.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retries_once_success_is_observed() {
        let hash_b = TxHash::from([0xbb; 32]);
        let sender_a = ScriptedSender::new(vec![Err(
            crate::blockchain::BlockchainError::Rpc("nonce too low".into()),
        )]);
        let sender_b = ScriptedSender::new(vec![Ok(hash_b)]);
        // B wins while A is sleeping out its first backoff.
        sender_b.set_delay(Duration::from_millis(10));

        let (a, _) = entry_with([0xaa; 20], sender_a.clone());
        let (b, _) = entry_with([0xbb; 20], sender_b.clone());
        let pool = pool_with(vec![a, b]).await;
        let broadcaster = broadcaster_for(pool);

        let result = broadcaster
            .broadcast(TransactionRequest::default(), no_wait(2, 5))
            .await;

        assert_eq!(result.unwrap(), hash_b);
        // A had four retries left but abandoned at its shared-state check.
        assert_eq!(sender_a.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_failed_surfaces_first_attempt_error() {
        let sender_a = ScriptedSender::new(vec![Err(
            crate::blockchain::BlockchainError::Rpc("wallet a rejected".into()),
        )]);
        let sender_b = ScriptedSender::new(vec![Err(
            crate::blockchain::BlockchainError::Rpc("wallet b rejected".into()),
        )]);

        let (a, _) = entry_with([0xaa; 20], sender_a);
        let (b, _) = entry_with([0xbb; 20], sender_b);
        let pool = pool_with(vec![a, b]).await;
        let broadcaster = broadcaster_for(pool);

        let result = broadcaster
            .broadcast(TransactionRequest::default(), no_wait(2, 1))
            .await;

        let error = result.unwrap_err();
        assert!(error.to_string().contains("wallet a rejected"), "{error}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_and_both_reverted_reports_first_wallet() {
        let hash_a = TxHash::from([0xaa; 32]);
        let hash_b = TxHash::from([0xbb; 32]);
        let sender_a = ScriptedSender::new(vec![Ok(hash_a)]);
        let sender_b = ScriptedSender::new(vec![Ok(hash_b)]);

        let reader = Arc::new(ScriptedReader::default());
        reader.push_receipt(hash_a, Ok(Some(crate::blockchain::ReceiptStatus::Reverted)));
        reader.push_receipt(hash_b, Ok(Some(crate::blockchain::ReceiptStatus::Reverted)));

        let (a, _) = entry_with([0xaa; 20], sender_a);
        let (b, _) = entry_with([0xbb; 20], sender_b);
        let pool = pool_with(vec![a, b]).await;
        let broadcaster = broadcaster_with_reader(pool, reader);

        let opts = BroadcastOptions {
            redundancy: 2,
            wait_for_confirmation: true,
            max_retries: 2,
            ..BroadcastOptions::default()
        };
        let result = broadcaster
            .broadcast(TransactionRequest::default(), opts)
            .await;

        // Both sends landed but both reverted; the first wallet's failure
        // is the one reported.
        assert!(
            matches!(result, Err(BroadcastError::Reverted { hash }) if hash == hash_a),
            "unexpected outcome"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_confirmation_success() {
        let hash = TxHash::from([0xcc; 32]);
        let sender = ScriptedSender::new(vec![Ok(hash)]);

        let reader = Arc::new(ScriptedReader::default());
        reader.push_receipt(hash, Ok(None));
        reader.push_receipt(hash, Ok(Some(crate::blockchain::ReceiptStatus::Success)));

        let (a, _) = entry_with([0xcc; 20], sender);
        let (b, _) = entry_with([0xdd; 20], ScriptedSender::new(Vec::new()));
        let pool = pool_with(vec![a, b]).await;
        let broadcaster = broadcaster_with_reader(pool, reader);

        let opts = BroadcastOptions {
            redundancy: 1,
            wait_for_confirmation: true,
            ..BroadcastOptions::default()
        };
        let result = broadcaster
            .broadcast(TransactionRequest::default(), opts)
            .await;
        assert_eq!(result.unwrap(), hash);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_winner_triggers_reorganize() {
        let hash = TxHash::from([0xee; 32]);
        let sender_a = ScriptedSender::new(vec![Ok(hash)]);
        let (a, addr_a) = entry_with([0x01; 20], sender_a);
        let (b, addr_b) = entry_with([0x02; 20], ScriptedSender::new(vec![Ok(hash)]));

        let reader = Arc::new(ScriptedReader::default());
        reader.set_balance(addr_a, U256::from(1));
        reader.set_balance(addr_b, U256::from(100));

        // The pool's own reader is the one reorganize consults.
        let pool = Arc::new(WalletPool::new(reader));
        let mut iter = vec![a, b].into_iter();
        pool.load(vec!["a".into(), "b".into()], |_| Ok(iter.next().unwrap()))
            .await
            .unwrap();

        let broadcaster = broadcaster_for(pool.clone());
        let result = broadcaster
            .broadcast(TransactionRequest::default(), no_wait(1, 1))
            .await;
        assert_eq!(result.unwrap(), hash);

        // Give the spawned reorganization a moment to land.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.address_at(0).await, Some(addr_b));
    }
}
