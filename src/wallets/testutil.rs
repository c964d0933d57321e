//! Scripted fakes for the chain capability traits, shared by the wallet
//! subsystem's unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainReader, ReceiptStatus, TxSender,
};
use crate::wallets::pool::WalletEntry;

/// Chain reader backed by in-memory tables.
///
/// Balances are static per address; receipt responses are consumed in
/// order, with "not found" once a script runs dry.
#[derive(Default)]
pub(crate) struct ScriptedReader {
    balances: Mutex<HashMap<Address, U256>>,
    failing: Mutex<HashSet<Address>>,
    receipts: Mutex<HashMap<TxHash, VecDeque<BlockchainResult<Option<ReceiptStatus>>>>>,
}

impl ScriptedReader {
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.lock().unwrap().insert(address, balance);
    }

    pub fn fail_balance(&self, address: Address) {
        self.failing.lock().unwrap().insert(address);
    }

    pub fn push_receipt(&self, hash: TxHash, result: BlockchainResult<Option<ReceiptStatus>>) {
        self.receipts
            .lock()
            .unwrap()
            .entry(hash)
            .or_default()
            .push_back(result);
    }
}

#[async_trait]
impl ChainReader for ScriptedReader {
    async fn balance_of(&self, address: Address) -> BlockchainResult<U256> {
        if self.failing.lock().unwrap().contains(&address) {
            return Err(BlockchainError::Rpc("balance read failed".into()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn receipt_status(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptStatus>> {
        self.receipts
            .lock()
            .unwrap()
            .get_mut(&hash)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(None))
    }
}

/// Sender that replays a scripted sequence of results and counts calls.
pub(crate) struct ScriptedSender {
    script: Mutex<VecDeque<BlockchainResult<TxHash>>>,
    calls: AtomicU32,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedSender {
    pub fn new(script: Vec<BlockchainResult<TxHash>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
            delay: Mutex::new(None),
        })
    }

    /// Delay every send by `delay` to order races deterministically under
    /// paused test time.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TxSender for ScriptedSender {
    async fn send(&self, _tx: &TransactionRequest) -> BlockchainResult<TxHash> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BlockchainError::Rpc("sender script exhausted".into())))
    }
}

/// A wallet entry with an inert sender, for pool-only tests.
pub(crate) fn entry(bytes: [u8; 20]) -> (WalletEntry, Address) {
    let address = Address::from(bytes);
    let sender = ScriptedSender::new(Vec::new());
    (WalletEntry::new(address, sender), address)
}

/// A wallet entry wired to the given scripted sender.
pub(crate) fn entry_with(bytes: [u8; 20], sender: Arc<ScriptedSender>) -> (WalletEntry, Address) {
    let address = Address::from(bytes);
    (WalletEntry::new(address, sender), address)
}
