//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the whitelist
//! client. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the whitelist client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Network the session must be attached to.
    pub network: NetworkConfig,

    /// Deployed whitelist contract.
    pub whitelist: WhitelistConfig,

    /// Local wallet standing in for the browser wallet.
    pub wallet: WalletConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Required chain ID (5 for Goerli, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// How often a submitted transaction is polled for its receipt.
    pub receipt_poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 5,
            rpc_timeout_secs: 10,
            receipt_poll_interval_ms: 2000,
        }
    }
}

/// Whitelist contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Address of the deployed Whitelist contract. Empty until deployed.
    pub contract_address: String,

    /// Constructor argument used by the deploy tool.
    pub max_whitelisted_addresses: u64,

    /// Compiled contract artifact (Hardhat or Foundry JSON).
    pub artifact_path: String,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            max_whitelisted_addresses: 10,
            artifact_path: "artifacts/contracts/Whitelist.sol/Whitelist.json".to_string(),
        }
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Environment variable holding the hex-encoded private key.
    pub private_key_env: String,

    /// Approve connection and signature prompts without asking.
    pub auto_approve: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "WHITELIST_PRIVATE_KEY".to_string(),
            auto_approve: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.network.chain_id, 5);
        assert_eq!(config.network.rpc_timeout_secs, 10);
        assert_eq!(config.whitelist.max_whitelisted_addresses, 10);
        assert!(config.whitelist.contract_address.is_empty());
        assert!(!config.wallet.auto_approve);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [network]
            chain_id = 31337

            [whitelist]
            contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            "#,
        )
        .unwrap();

        assert_eq!(config.network.chain_id, 31337);
        assert_eq!(config.network.rpc_url, "http://localhost:8545");
        assert_eq!(config.whitelist.max_whitelisted_addresses, 10);
        assert_eq!(config.wallet.private_key_env, "WHITELIST_PRIVATE_KEY");
    }
}
