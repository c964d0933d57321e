//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// API surface exposed to relay clients.
    pub api: ApiConfig,

    /// Chain RPC settings.
    pub chain: ChainConfig,

    /// Encrypted keystore settings.
    pub keystore: KeystoreConfig,

    /// Redundant broadcast settings.
    pub broadcast: BroadcastConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl RelayConfig {
    /// Path the JSON-RPC endpoint is served under.
    pub fn base_path(&self) -> String {
        format!("/api/v2/{}/{}", self.chain.chain_id, self.api.api_key)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// API surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key embedded in the endpoint path.
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: "testAPIKey".to_string(),
        }
    }
}

/// Chain RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs for read queries.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 11155111 for Sepolia).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// EntryPoint contract the relayed operations are executed through.
    pub entry_point: String,

    /// Upstream bundler URL gas estimation and status queries are forwarded to.
    pub bundler_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.sepolia.org".to_string(),
            failover_urls: Vec::new(),
            chain_id: 11155111,
            rpc_timeout_secs: 10,
            entry_point: "0x5ff137d4b0fdcd49dca30c7cf57e578a026d2789".to_string(),
            bundler_url: "https://bundler.example.org/api/v2/11155111".to_string(),
        }
    }
}

/// Encrypted keystore configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// Paths to encrypted private key files.
    pub key_paths: Vec<String>,

    /// Seconds the pool may stay locked after construction before the
    /// process gives up and exits.
    pub unlock_timeout_secs: u64,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            key_paths: Vec::new(),
            unlock_timeout_secs: 100,
        }
    }
}

/// Redundant broadcast configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Number of wallets a transaction is submitted through concurrently.
    pub redundancy: usize,

    /// Whether a broadcast waits for on-chain confirmation before reporting
    /// success, or treats a successful send as the outcome.
    pub wait_for_confirmation: bool,

    /// Maximum number of send attempts per wallet.
    pub max_retries: u32,

    /// Base delay between send retries in milliseconds, doubled each retry.
    pub initial_backoff_ms: u64,

    /// Maximum number of receipt polls per monitored transaction.
    pub monitor_max_retries: u32,

    /// Base delay between receipt polls in milliseconds, doubled each poll.
    pub monitor_initial_delay_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            redundancy: 2,
            wait_for_confirmation: true,
            max_retries: 3,
            initial_backoff_ms: 1000,
            monitor_max_retries: 5,
            monitor_initial_delay_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
