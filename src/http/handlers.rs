//! JSON-RPC method handlers.

use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use serde_json::Value;
use thiserror::Error;

use crate::http::jsonrpc::JsonRpcRequest;
use crate::http::server::AppState;
use crate::userop::{encode_handle_ops, UserOperation};
use crate::wallets::BroadcastError;

/// Errors a handler can produce. The server collapses all of them into a
/// generic internal-error response; the distinctions exist for logs.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("wallet pool is empty")]
    NoBeneficiary,

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error("upstream bundler request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Relay a user operation through the wallet pool.
///
/// The operation is wrapped in a `handleOps` call against the configured
/// EntryPoint. The least-funded pool wallet is named as beneficiary, so
/// refunded fees drift toward the wallet that needs them most.
pub async fn send_user_operation(
    state: &AppState,
    request: &JsonRpcRequest,
) -> Result<Value, HandlerError> {
    let op_value = request
        .params
        .as_ref()
        .and_then(|params| params.get(0))
        .ok_or_else(|| {
            HandlerError::InvalidParams("expected a user operation as params[0]".to_string())
        })?;
    let op: UserOperation = serde_json::from_value(op_value.clone())
        .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;

    let beneficiary = state
        .pool
        .address_at(-1)
        .await
        .ok_or(HandlerError::NoBeneficiary)?;

    let data = encode_handle_ops(&op, beneficiary);
    let tx = TransactionRequest::default()
        .with_to(state.entry_point)
        .with_input(data);

    let hash = state.broadcaster.submit(tx).await?;

    tracing::info!(hash = %hash, sender = %op.sender, "UserOperation relayed");
    Ok(serde_json::json!({ "result": hash }))
}

/// Forward the raw request body to the upstream bundler and return its
/// response verbatim. Used for gas estimation and status queries, which
/// this node does not answer locally.
pub async fn forward_to_bundler(state: &AppState, body: &Value) -> Result<Value, HandlerError> {
    let response = state
        .http
        .post(&state.bundler_url)
        .json(body)
        .send()
        .await?;
    Ok(response.json().await?)
}
