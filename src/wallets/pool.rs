//! Balance-ordered pool of signing wallets.
//!
//! # Responsibilities
//! - Own the wallet entries and their cached balances
//! - Keep the pool sorted by descending balance
//! - Gate all broadcasting behind the unlocked flag
//!
//! All membership and ordering mutation happens under one mutex. Balance
//! reads against the chain run unlocked; only committing the resorted order
//! takes the lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blockchain::types::{BlockchainResult, ChainReader, TxSender};

/// Minimum number of wallets required to provide send redundancy.
pub const MIN_WALLETS: usize = 2;

/// Fatal bootstrap faults. The caller must not serve traffic after one of
/// these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("at least {MIN_WALLETS} wallets are required to run the relay, loaded {loaded}")]
    NotEnoughWallets { loaded: usize },
}

/// One signing identity plus its send capability.
///
/// Immutable after creation and cheap to clone; the pool hands out clones
/// as broadcast snapshots.
#[derive(Clone)]
pub struct WalletEntry {
    address: Address,
    sender: Arc<dyn TxSender>,
}

impl WalletEntry {
    pub fn new(address: Address, sender: Arc<dyn TxSender>) -> Self {
        Self { address, sender }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sender(&self) -> &Arc<dyn TxSender> {
        &self.sender
    }
}

impl fmt::Debug for WalletEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletEntry")
            .field("address", &self.address)
            .finish()
    }
}

#[derive(Default)]
struct PoolInner {
    wallets: Vec<WalletEntry>,
    balances: HashMap<Address, U256>,
}

/// Mutex-guarded pool of signing wallets, ordered by available balance.
pub struct WalletPool {
    inner: Mutex<PoolInner>,
    reader: Arc<dyn ChainReader>,
    unlocked: AtomicBool,
}

impl WalletPool {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self {
            inner: Mutex::new(PoolInner::default()),
            reader,
            unlocked: AtomicBool::new(false),
        }
    }

    /// Derive one wallet entry per decrypted key and unlock the pool.
    ///
    /// A key that fails derivation is logged and skipped; ending up with
    /// fewer than [`MIN_WALLETS`] entries is fatal. Returns the number of
    /// wallets loaded.
    pub async fn load<F>(&self, keys: Vec<String>, mut derive: F) -> Result<usize, StartupError>
    where
        F: FnMut(&str) -> BlockchainResult<WalletEntry>,
    {
        let mut entries = Vec::new();
        for key in &keys {
            match derive(key) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping wallet that failed derivation");
                }
            }
        }

        let loaded = entries.len();
        if loaded < MIN_WALLETS {
            return Err(StartupError::NotEnoughWallets { loaded });
        }

        {
            let mut inner = self.inner.lock().await;
            inner.wallets.extend(entries);
        }
        self.unlocked.store(true, Ordering::SeqCst);

        tracing::info!(wallets = loaded, "Wallet pool unlocked");
        Ok(loaded)
    }

    /// Whether broadcasting is allowed yet.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    /// Number of wallets currently in the pool.
    pub async fn wallet_count(&self) -> usize {
        self.inner.lock().await.wallets.len()
    }

    /// Address of the wallet at `index` in balance order.
    ///
    /// Any out-of-range index, negative or past the end, resolves to the
    /// last (lowest-balance) entry. Callers pass `-1` to mean "the least
    /// funded wallet"; the clamp on large positive indices is intentional
    /// and kept for compatibility, not an accident of bounds checking.
    /// Returns `None` only when the pool is empty.
    pub async fn address_at(&self, index: isize) -> Option<Address> {
        let inner = self.inner.lock().await;
        if inner.wallets.is_empty() {
            return None;
        }
        let idx = if index < 0 || index as usize >= inner.wallets.len() {
            inner.wallets.len() - 1
        } else {
            index as usize
        };
        Some(inner.wallets[idx].address())
    }

    /// Snapshot of the `n` best-funded wallets, in balance order.
    pub(crate) async fn top_wallets(&self, n: usize) -> Vec<WalletEntry> {
        let inner = self.inner.lock().await;
        inner.wallets.iter().take(n).cloned().collect()
    }

    /// Refresh every wallet's balance and re-sort the pool.
    ///
    /// Reads run in parallel without the lock (entries are immutable); the
    /// lock is taken once to commit the balances and the stable descending
    /// sort. A failed read keeps the previous cached balance for that
    /// wallet.
    pub async fn reorganize(&self) {
        let addresses: Vec<Address> = {
            let inner = self.inner.lock().await;
            inner.wallets.iter().map(|w| w.address()).collect()
        };

        let reads = join_all(addresses.iter().map(|a| self.reader.balance_of(*a))).await;

        let mut inner = self.inner.lock().await;
        let PoolInner { wallets, balances } = &mut *inner;

        for (address, result) in addresses.iter().zip(reads) {
            match result {
                Ok(balance) => {
                    balances.insert(*address, balance);
                }
                Err(e) => {
                    tracing::warn!(
                        address = %address,
                        error = %e,
                        "Balance refresh failed, keeping cached value"
                    );
                }
            }
        }

        wallets.sort_by(|a, b| {
            let balance_a = balances.get(&a.address()).copied().unwrap_or(U256::ZERO);
            let balance_b = balances.get(&b.address()).copied().unwrap_or(U256::ZERO);
            balance_b.cmp(&balance_a)
        });
    }

    /// Exit the process if the pool is still locked after `window`.
    ///
    /// A pool that never unlocks can serve no requests; failing fast beats
    /// sitting half-initialized behind a live listener.
    pub fn spawn_unlock_watchdog(self: Arc<Self>, window: Duration) {
        let pool = self;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if !pool.is_unlocked() {
                tracing::error!(
                    timeout_secs = window.as_secs(),
                    "Wallet pool was not unlocked in time, exiting"
                );
                std::process::exit(1);
            }
        });
    }
}
