//! Wallet pool and redundant broadcast subsystem.
//!
//! # Data Flow
//! ```text
//! Decrypted keys
//!     → pool.rs (balance-ordered entries, unlock gate)
//!     → broadcast.rs (top-K concurrent attempts, race arbitration)
//!     → monitor.rs (receipt polling with bounded backoff)
//!     → pool reorganization (balances moved)
//! ```
//!
//! # Design Decisions
//! - One pool per process, passed explicitly as an Arc, never a global
//! - The pool mutex totally orders membership and ordering mutations
//! - Each broadcast call owns its own shared-success state; the pool-wide
//!   lock is never held across a network call
//! - Losing attempts are abandoned, not cancelled

pub mod broadcast;
pub mod monitor;
pub mod pool;

#[cfg(test)]
pub(crate) mod testutil;

pub use broadcast::{BroadcastError, BroadcastOptions, Broadcaster};
pub use monitor::{ConfirmationStatus, TxMonitor};
pub use pool::{StartupError, WalletEntry, WalletPool, MIN_WALLETS};
