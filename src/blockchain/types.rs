//! Chain-specific types and error definitions.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced by the connection and whitelist operations.
///
/// `Clone` because a coalesced connection attempt hands the same outcome to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WhitelistError {
    /// The user declined the wallet connection prompt.
    #[error("Wallet connection rejected by user")]
    ConnectionRejected,

    /// No compatible wallet could be found.
    #[error("No wallet available: {0}")]
    NoWalletAvailable(String),

    /// The wallet is attached to a different chain than required.
    #[error("Wrong network: connected to chain {actual}, required chain {required}")]
    WrongNetwork { actual: ChainId, required: ChainId },

    /// A write binding was requested on a handle without a signer.
    #[error("Operation requires a signing-capable wallet")]
    SigningCapabilityRequired,

    /// A join transaction is already in flight for this session.
    #[error("A join transaction is already pending")]
    AlreadyPending,

    /// The connected address is already on the whitelist.
    #[error("Address is already whitelisted")]
    AlreadyJoined,

    /// The session has no validated connection.
    #[error("Session is not connected")]
    NotConnected,

    /// The user declined to sign the transaction.
    #[error("Transaction rejected by user")]
    UserRejected,

    /// The transaction was mined but execution failed.
    #[error("Transaction {0} reverted")]
    TransactionReverted(TxHash),

    /// Transport or decoding failure talking to the RPC.
    #[error("RPC error: {0}")]
    RpcFailure(String),
}

impl WhitelistError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionRejected => "connection_rejected",
            Self::NoWalletAvailable(_) => "no_wallet_available",
            Self::WrongNetwork { .. } => "wrong_network",
            Self::SigningCapabilityRequired => "signing_capability_required",
            Self::AlreadyPending => "already_pending",
            Self::AlreadyJoined => "already_joined",
            Self::NotConnected => "not_connected",
            Self::UserRejected => "user_rejected",
            Self::TransactionReverted(_) => "transaction_reverted",
            Self::RpcFailure(_) => "rpc_failure",
        }
    }
}

/// Result type for whitelist operations.
pub type WhitelistResult<T> = Result<T, WhitelistError>;

/// What a connection is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    ReadSign,
}

/// Result of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// An authenticated link to a wallet-controlled account on some network.
///
/// This is what the wallet-selection capability hands back; everything the
/// session does on-chain goes through it.
#[async_trait]
pub trait WalletLink: Send + Sync {
    /// Chain the link is currently attached to. Queried live, since the user
    /// can switch networks in the wallet at any time.
    async fn chain_id(&self) -> WhitelistResult<ChainId>;

    /// Signing account, if the link can sign.
    fn signer(&self) -> Option<Address>;

    /// Execute a read-only call.
    async fn call(&self, to: Address, input: Bytes) -> WhitelistResult<Bytes>;

    /// Ask the wallet to sign and broadcast a call. Resolves once the wallet
    /// returns a transaction hash.
    async fn send_transaction(&self, to: Address, input: Bytes) -> WhitelistResult<TxHash>;

    /// Receipt for `tx_hash`, or `None` while it is not yet mined.
    async fn receipt(&self, tx_hash: TxHash) -> WhitelistResult<Option<TransactionReceipt>>;
}

/// Opaque capability representing one authenticated wallet connection.
///
/// Cloning shares the same underlying link.
#[derive(Clone)]
pub struct ConnectionHandle {
    link: Arc<dyn WalletLink>,
}

impl ConnectionHandle {
    pub fn new(link: Arc<dyn WalletLink>) -> Self {
        Self { link }
    }

    pub fn capability(&self) -> Capability {
        match self.link.signer() {
            Some(_) => Capability::ReadSign,
            None => Capability::Read,
        }
    }

    /// Account address, derived from the signing capability.
    pub fn address(&self) -> Option<Address> {
        self.link.signer()
    }

    pub async fn chain_id(&self) -> WhitelistResult<ChainId> {
        self.link.chain_id().await
    }

    /// True when both handles share one underlying connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.link, &other.link)
    }

    pub(crate) fn link(&self) -> &dyn WalletLink {
        self.link.as_ref()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("capability", &self.capability())
            .field("address", &self.address())
            .finish()
    }
}
