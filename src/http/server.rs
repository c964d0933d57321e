//! HTTP server setup and JSON-RPC dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the relay endpoint
//! - Wire up middleware (timeout, request ID, tracing)
//! - Validate the JSON-RPC envelope and dispatch on the method field
//! - Translate handler errors into generic wire responses

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::http::handlers;
use crate::http::jsonrpc::{methods, JsonRpcRequest, JsonRpcResponse};
use crate::http::request::propagate_request_id;
use crate::observability::metrics;
use crate::wallets::{Broadcaster, WalletPool};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<WalletPool>,
    pub broadcaster: Arc<Broadcaster>,
    pub http: reqwest::Client,
    pub entry_point: Address,
    pub bundler_url: String,
}

/// JSON-RPC server for the relay.
pub struct RpcServer {
    router: Router,
}

impl RpcServer {
    /// Create a new server with the given configuration and state.
    pub fn new(config: &RelayConfig, state: AppState) -> Self {
        let router = Router::new()
            .route(&config.base_path(), post(rpc_handler))
            .fallback(unknown_route)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(middleware::from_fn(propagate_request_id))
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// Run the server until the shutdown signal fires.
    ///
    /// New requests stop being accepted on shutdown; in-flight broadcasts
    /// are not interrupted.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "JSON-RPC server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("JSON-RPC server stopped");
        Ok(())
    }
}

/// Single JSON-RPC endpoint; the method field selects the handler.
async fn rpc_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(body) = serde_json::from_slice::<Value>(&body) else {
        return invalid_request();
    };
    let request: JsonRpcRequest = match serde_json::from_value(body.clone()) {
        Ok(request) => request,
        Err(_) => return invalid_request(),
    };
    if !request.is_supported_version() {
        return invalid_request();
    }

    tracing::debug!(method = %request.method, "Dispatching JSON-RPC request");

    match request.method.as_str() {
        methods::SEND_USER_OPERATION => {
            match handlers::send_user_operation(&state, &request).await {
                Ok(result) => {
                    metrics::record_rpc_request(&request.method, "ok");
                    Json(JsonRpcResponse::result(request.id, result)).into_response()
                }
                Err(error) => {
                    tracing::warn!(method = %request.method, error = %error, "Handler failed");
                    metrics::record_rpc_request(&request.method, "error");
                    internal_error(request.id)
                }
            }
        }
        methods::ESTIMATE_USER_OPERATION_GAS | methods::GET_USER_OPERATION_STATUS => {
            match handlers::forward_to_bundler(&state, &body).await {
                Ok(result) => {
                    metrics::record_rpc_request(&request.method, "ok");
                    Json(result).into_response()
                }
                Err(error) => {
                    tracing::warn!(method = %request.method, error = %error, "Forwarding failed");
                    metrics::record_rpc_request(&request.method, "error");
                    internal_error(request.id)
                }
            }
        }
        _ => {
            metrics::record_rpc_request(&request.method, "unknown");
            method_not_found()
        }
    }
}

async fn unknown_route() -> Response {
    method_not_found()
}

fn method_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Invalid method" })),
    )
        .into_response()
}

fn invalid_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "Invalid JSON-RPC request" })),
    )
        .into_response()
}

fn internal_error(id: Option<Value>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(JsonRpcResponse::internal_error(id)),
    )
        .into_response()
}
