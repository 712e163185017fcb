//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use std::time::Duration;

use alloy::primitives::Address;
use thiserror::Error;

use crate::blockchain::types::ChainId;
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("whitelist.contract_address is not set; deploy the contract first")]
    MissingContractAddress,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` when given, otherwise validate and return the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = AppConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

impl AppConfig {
    /// The chain every session operation must target.
    pub fn required_chain(&self) -> ChainId {
        ChainId(self.network.chain_id)
    }

    /// Parsed address of the deployed contract.
    pub fn contract_address(&self) -> Result<Address, ConfigError> {
        let raw = self.whitelist.contract_address.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingContractAddress);
        }
        raw.parse().map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "whitelist.contract_address",
                message: format!("{}", e),
            }])
        })
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.network.rpc_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.network.receipt_poll_interval_ms)
    }
}
