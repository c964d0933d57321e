//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/v2/{chain_id}/{api_key}
//!     → request.rs (attach request ID)
//!     → server.rs (envelope validation, method dispatch)
//!     → handlers.rs (relay / forward)
//!     → jsonrpc.rs (response framing)
//! ```

pub mod handlers;
pub mod jsonrpc;
pub mod request;
pub mod server;

pub use jsonrpc::{JsonRpcRequest, JsonRpcResponse};
pub use request::X_REQUEST_ID;
pub use server::{AppState, RpcServer};
