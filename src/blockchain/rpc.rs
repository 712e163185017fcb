//! JSON-RPC wallet link backed by alloy.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//! - Every connection and every signature goes through the approver

use std::fmt::Display;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::gateway::WalletConnector;
use crate::blockchain::prompt::Approver;
use crate::blockchain::types::{
    ChainId, TransactionReceipt, WalletLink, WhitelistError, WhitelistResult,
};
use crate::config::AppConfig;

/// Parse a hex-encoded private key (with or without 0x prefix).
pub fn parse_private_key(private_key_hex: &str) -> WhitelistResult<PrivateKeySigner> {
    let key_hex = private_key_hex.trim();
    let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

    key_hex
        .parse()
        .map_err(|e| WhitelistError::NoWalletAvailable(format!("Invalid private key format: {}", e)))
}

/// Wallet link over an HTTP JSON-RPC provider.
pub struct RpcWalletLink {
    provider: Arc<dyn Provider + Send + Sync>,
    signer: Option<Address>,
    approver: Option<Arc<dyn Approver>>,
    timeout_duration: Duration,
}

impl RpcWalletLink {
    /// A link that can read but not sign.
    pub fn read_only(rpc_url: url::Url, timeout_duration: Duration) -> Self {
        Self {
            provider: Arc::new(ProviderBuilder::new().connect_http(rpc_url)),
            signer: None,
            approver: None,
            timeout_duration,
        }
    }

    /// A link that signs with `signer` after the approver agrees.
    pub fn with_signer(
        rpc_url: url::Url,
        signer: PrivateKeySigner,
        approver: Arc<dyn Approver>,
        timeout_duration: Duration,
    ) -> Self {
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url);

        Self {
            provider: Arc::new(provider),
            signer: Some(address),
            approver: Some(approver),
            timeout_duration,
        }
    }

    async fn rpc<T, E, F>(&self, method: &str, fut: F) -> WhitelistResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(WhitelistError::RpcFailure(format!("{} failed: {}", method, e))),
            Err(_) => Err(WhitelistError::RpcFailure(format!(
                "{} timed out after {} seconds",
                method,
                self.timeout_duration.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl WalletLink for RpcWalletLink {
    async fn chain_id(&self) -> WhitelistResult<ChainId> {
        self.rpc("eth_chainId", self.provider.get_chain_id().into_future())
            .await
            .map(ChainId)
    }

    fn signer(&self) -> Option<Address> {
        self.signer
    }

    async fn call(&self, to: Address, input: Bytes) -> WhitelistResult<Bytes> {
        let mut tx = TransactionRequest::default().with_to(to).with_input(input);
        if let Some(from) = self.signer {
            tx = tx.with_from(from);
        }
        self.rpc("eth_call", self.provider.call(tx).into_future()).await
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> WhitelistResult<TxHash> {
        let (Some(from), Some(approver)) = (self.signer, self.approver.as_ref()) else {
            return Err(WhitelistError::SigningCapabilityRequired);
        };

        let request = format!("Sign transaction from {} to contract {}?", from, to);
        if !approver.approve(&request).await {
            return Err(WhitelistError::UserRejected);
        }

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(input);

        // Nonce, gas and chain id are left to the wallet's fillers.
        let pending = self
            .rpc("eth_sendTransaction", self.provider.send_transaction(tx))
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, tx_hash: TxHash) -> WhitelistResult<Option<TransactionReceipt>> {
        let receipt = self
            .rpc(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(tx_hash).into_future(),
            )
            .await?;

        Ok(receipt.map(|r| TransactionReceipt {
            tx_hash: r.transaction_hash,
            block_number: r.block_number,
            success: r.status(),
        }))
    }
}

impl std::fmt::Debug for RpcWalletLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcWalletLink")
            .field("signer", &self.signer)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

/// Connects a key held in the environment, asking the user first.
pub struct LocalWalletConnector {
    rpc_url: url::Url,
    private_key_env: String,
    read_only: bool,
    approver: Arc<dyn Approver>,
    timeout_duration: Duration,
}

impl LocalWalletConnector {
    pub fn new(
        rpc_url: url::Url,
        private_key_env: impl Into<String>,
        read_only: bool,
        approver: Arc<dyn Approver>,
        timeout_duration: Duration,
    ) -> Self {
        Self {
            rpc_url,
            private_key_env: private_key_env.into(),
            read_only,
            approver,
            timeout_duration,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        read_only: bool,
        approver: Arc<dyn Approver>,
    ) -> WhitelistResult<Self> {
        let rpc_url = config.network.rpc_url.parse().map_err(|e| {
            WhitelistError::RpcFailure(format!(
                "Invalid RPC URL '{}': {}",
                config.network.rpc_url, e
            ))
        })?;

        Ok(Self::new(
            rpc_url,
            config.wallet.private_key_env.clone(),
            read_only,
            approver,
            config.rpc_timeout(),
        ))
    }
}

#[async_trait]
impl WalletConnector for LocalWalletConnector {
    async fn request_connection(&self) -> WhitelistResult<Arc<dyn WalletLink>> {
        if self.read_only {
            tracing::info!(rpc_url = %self.rpc_url, "Opening read-only connection");
            return Ok(Arc::new(RpcWalletLink::read_only(
                self.rpc_url.clone(),
                self.timeout_duration,
            )));
        }

        let private_key = std::env::var(&self.private_key_env).map_err(|_| {
            WhitelistError::NoWalletAvailable(format!(
                "Environment variable {} not set",
                self.private_key_env
            ))
        })?;
        let signer = parse_private_key(&private_key)?;
        let address = signer.address();

        let request = format!("Connect wallet {} to {}?", address, self.rpc_url);
        if !self.approver.approve(&request).await {
            return Err(WhitelistError::ConnectionRejected);
        }

        Ok(Arc::new(RpcWalletLink::with_signer(
            self.rpc_url.clone(),
            signer,
            Arc::clone(&self.approver),
            self.timeout_duration,
        )))
    }
}
