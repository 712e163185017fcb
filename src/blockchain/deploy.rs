//! One-shot deployment of the Whitelist contract.
//!
//! # Data Flow
//! ```text
//! artifact JSON (Hardhat or Foundry)
//!     → creation bytecode
//!     → + ABI-encoded maxWhitelistedAddresses
//!     → signed deploy transaction
//!     → receipt.contract_address
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolValue;
use serde_json::Value;
use thiserror::Error;

use crate::blockchain::rpc::parse_private_key;
use crate::config::AppConfig;

/// Errors that abort a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Could not read artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Artifact is not valid JSON: {0}")]
    ArtifactJson(#[from] serde_json::Error),

    #[error("Artifact has no creation bytecode")]
    MissingBytecode,

    #[error("Invalid bytecode hex: {0}")]
    BadBytecode(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid RPC URL '{0}'")]
    RpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Deployment transaction {0} reverted")]
    Reverted(TxHash),

    #[error("Receipt for {0} carries no contract address")]
    NoContractAddress(TxHash),
}

/// Read creation bytecode from a compiled artifact.
///
/// Accepts Hardhat (`"bytecode": "0x.."`) and Foundry
/// (`"bytecode": {"object": "0x.."}`) layouts.
pub fn load_bytecode(path: &Path) -> Result<Bytes, DeployError> {
    let content = fs::read_to_string(path).map_err(|source| DeployError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: Value = serde_json::from_str(&content)?;

    let hex = match &artifact["bytecode"] {
        Value::String(hex) => hex.as_str(),
        Value::Object(obj) => obj
            .get("object")
            .and_then(Value::as_str)
            .ok_or(DeployError::MissingBytecode)?,
        _ => return Err(DeployError::MissingBytecode),
    };

    let bytecode: Bytes = hex
        .parse()
        .map_err(|e| DeployError::BadBytecode(format!("{}", e)))?;
    if bytecode.is_empty() {
        return Err(DeployError::MissingBytecode);
    }
    Ok(bytecode)
}

/// Creation code followed by the encoded constructor argument.
pub fn creation_code(bytecode: &Bytes, max_whitelisted_addresses: u64) -> Bytes {
    let mut code = bytecode.to_vec();
    code.extend_from_slice(&U256::from(max_whitelisted_addresses).abi_encode());
    code.into()
}

/// Deploy the contract and wait for it to be mined.
pub async fn deploy_whitelist(config: &AppConfig) -> Result<Address, DeployError> {
    let bytecode = load_bytecode(Path::new(&config.whitelist.artifact_path))?;

    let private_key = std::env::var(&config.wallet.private_key_env).map_err(|_| {
        DeployError::Wallet(format!(
            "Environment variable {} not set",
            config.wallet.private_key_env
        ))
    })?;
    let signer = parse_private_key(&private_key).map_err(|e| DeployError::Wallet(e.to_string()))?;
    let deployer = signer.address();

    let rpc_url: url::Url = config
        .network
        .rpc_url
        .parse()
        .map_err(|_| DeployError::RpcUrl(config.network.rpc_url.clone()))?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url);

    let max = config.whitelist.max_whitelisted_addresses;
    tracing::info!(
        deployer = %deployer,
        max_whitelisted_addresses = max,
        "Deploying Whitelist contract"
    );

    let tx = TransactionRequest::default()
        .with_from(deployer)
        .with_deploy_code(creation_code(&bytecode, max));

    let pending = provider
        .send_transaction(tx)
        .await
        .map_err(|e| DeployError::Rpc(e.to_string()))?;
    let tx_hash = *pending.tx_hash();
    tracing::info!(tx_hash = %tx_hash, "Deployment submitted, waiting for receipt");

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| DeployError::Rpc(e.to_string()))?;

    if !receipt.status() {
        return Err(DeployError::Reverted(tx_hash));
    }
    let address = receipt
        .contract_address
        .ok_or(DeployError::NoContractAddress(tx_hash))?;

    tracing::info!(address = %address, block_number = ?receipt.block_number, "Whitelist deployed");
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_artifact(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("whitelist-artifact-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_creation_code_appends_constructor_arg() {
        let bytecode = Bytes::from(vec![0x60, 0x80]);
        let code = creation_code(&bytecode, 10);

        assert_eq!(code.len(), 2 + 32);
        assert_eq!(&code[..2], &[0x60, 0x80]);
        assert_eq!(code[code.len() - 1], 10);
        assert!(code[2..code.len() - 1].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_load_hardhat_artifact() {
        let path = write_artifact(r#"{"contractName":"Whitelist","bytecode":"0x6080604052"}"#);
        let bytecode = load_bytecode(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_load_foundry_artifact() {
        let path = write_artifact(r#"{"bytecode":{"object":"0x6080","linkReferences":{}}}"#);
        let bytecode = load_bytecode(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(bytecode.as_ref(), &[0x60, 0x80]);
    }

    #[test]
    fn test_artifact_without_bytecode() {
        let path = write_artifact(r#"{"abi":[]}"#);
        let result = load_bytecode(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(DeployError::MissingBytecode)));

        let path = write_artifact(r#"{"bytecode":"0x"}"#);
        let result = load_bytecode(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(DeployError::MissingBytecode)));
    }

    #[test]
    fn test_missing_artifact_file() {
        let result = load_bytecode(Path::new("/nonexistent/Whitelist.json"));
        assert!(matches!(result, Err(DeployError::Artifact { .. })));
    }
}
