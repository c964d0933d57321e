//! JSON-RPC envelope types and validation.
//!
//! Only the 2.0 framing is supported. Error codes travel as strings, which
//! is what this API's clients expect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only supported protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names dispatched by the relay.
pub mod methods {
    pub const SEND_USER_OPERATION: &str = "eth_sendUserOperation";
    pub const ESTIMATE_USER_OPERATION_GAS: &str = "eth_estimateUserOperationGas";
    pub const GET_USER_OPERATION_STATUS: &str = "biconomy_getUserOperationStatus";
}

/// An incoming JSON-RPC request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// Whether the declared protocol version is one we speak.
    pub fn is_supported_version(&self) -> bool {
        self.jsonrpc == JSONRPC_VERSION
    }
}

/// Error object carried in a response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: String,
    pub message: String,
}

/// An outgoing JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// A successful response carrying `result`.
    pub fn result(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// The generic internal-error response. Core errors are never exposed
    /// on the wire.
    pub fn internal_error(id: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code: "-32603".to_string(),
                message: "Internal server error".to_string(),
            }),
        }
    }
}
