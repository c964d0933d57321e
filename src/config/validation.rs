//! Semantic configuration checks.
//!
//! Serde handles the syntactic layer; everything here is about values that
//! parse fine but cannot run (unparseable addresses, a redundancy of zero).

use std::net::SocketAddr;

use alloy::primitives::Address;
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single failed semantic check.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a valid socket address")]
    BindAddress(String),

    #[error("observability.metrics_address '{0}' is not a valid socket address")]
    MetricsAddress(String),

    #[error("chain.rpc_url '{0}' is not a valid URL")]
    RpcUrl(String),

    #[error("chain.failover_urls entry '{0}' is not a valid URL")]
    FailoverUrl(String),

    #[error("chain.entry_point '{0}' is not a valid address")]
    EntryPoint(String),

    #[error("broadcast.redundancy must be at least 1")]
    Redundancy,

    #[error("broadcast.max_retries must be at least 1")]
    MaxRetries,

    #[error("broadcast.monitor_max_retries must be at least 1")]
    MonitorMaxRetries,

    #[error("keystore.key_paths must not be empty")]
    NoKeyPaths,
}

/// Run all semantic checks, collecting every failure rather than stopping
/// at the first one.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.chain.rpc_url.parse::<Url>().is_err() {
        errors.push(ValidationError::RpcUrl(config.chain.rpc_url.clone()));
    }

    for url in &config.chain.failover_urls {
        if url.parse::<Url>().is_err() {
            errors.push(ValidationError::FailoverUrl(url.clone()));
        }
    }

    if config.chain.entry_point.parse::<Address>().is_err() {
        errors.push(ValidationError::EntryPoint(config.chain.entry_point.clone()));
    }

    if config.broadcast.redundancy == 0 {
        errors.push(ValidationError::Redundancy);
    }

    if config.broadcast.max_retries == 0 {
        errors.push(ValidationError::MaxRetries);
    }

    if config.broadcast.monitor_max_retries == 0 {
        errors.push(ValidationError::MonitorMaxRetries);
    }

    if config.keystore.key_paths.is_empty() {
        errors.push(ValidationError::NoKeyPaths);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.keystore.key_paths = vec!["keys/a.json".into(), "keys/b.json".into()];
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_key_paths() {
        let config = RelayConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::NoKeyPaths)));
    }

    #[test]
    fn test_zero_redundancy_rejected() {
        let mut config = valid_config();
        config.broadcast.redundancy = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::Redundancy)));
    }

    #[test]
    fn test_bad_entry_point_rejected() {
        let mut config = valid_config();
        config.chain.entry_point = "not-an-address".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::EntryPoint(_))));
    }
}
