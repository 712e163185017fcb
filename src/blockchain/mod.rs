//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! WalletConnector (wallet-selection capability)
//!     → gateway.rs (one cached ConnectionHandle, coalesced prompts)
//!     → validator.rs (chain id must match configuration)
//!     → binding.rs (reader / writer over the IWhitelist interface)
//!     → tracker.rs (submit, wait for mining, report revert)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - No read or write before the chain is verified

pub mod binding;
pub mod deploy;
pub mod gateway;
pub mod prompt;
pub mod rpc;
pub mod tracker;
pub mod types;
pub mod validator;

pub use binding::{BindingMode, ContractBinding, ContractCall};
pub use gateway::{ProviderGateway, WalletConnector};
pub use tracker::{PendingTransaction, TransactionTracker};
pub use types::{
    Capability, ChainId, ConnectionHandle, TransactionReceipt, WalletLink, WhitelistError,
    WhitelistResult,
};
pub use validator::NetworkValidator;
