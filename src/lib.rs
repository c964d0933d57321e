//! ERC-4337 UserOperation relay library.

pub mod blockchain;
pub mod config;
pub mod http;
pub mod keystore;
pub mod lifecycle;
pub mod observability;
pub mod userop;
pub mod wallets;

pub use config::RelayConfig;
pub use http::RpcServer;
pub use lifecycle::Shutdown;
