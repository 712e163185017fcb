//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, chain id set)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - An empty contract address is accepted here; commands that need it
//!   resolve it through [`AppConfig::contract_address`]

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::AppConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint and collect the failures.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.network.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new(
            "network.rpc_url",
            format!("invalid URL '{}': {}", config.network.rpc_url, e),
        ));
    }
    if config.network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be non-zero"));
    }
    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be non-zero"));
    }
    if config.network.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "network.receipt_poll_interval_ms",
            "must be non-zero",
        ));
    }

    let contract = config.whitelist.contract_address.trim();
    if !contract.is_empty() && contract.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "whitelist.contract_address",
            format!("'{}' is not a 20-byte hex address", contract),
        ));
    }
    if config.whitelist.max_whitelisted_addresses == 0 {
        errors.push(ValidationError::new(
            "whitelist.max_whitelisted_addresses",
            "must be non-zero",
        ));
    }

    if config.wallet.private_key_env.trim().is_empty() {
        errors.push(ValidationError::new("wallet.private_key_env", "must be set"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
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

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.network.rpc_url = "not a url".to_string();
        config.network.chain_id = 0;
        config.whitelist.contract_address = "0x1234".to_string();
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "network.rpc_url",
                "network.chain_id",
                "whitelist.contract_address",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_accepts_checksummed_address() {
        let mut config = AppConfig::default();
        config.whitelist.contract_address =
            "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
