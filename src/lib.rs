//! Whitelist dApp client library.
//!
//! Connects a wallet, verifies the chain, reads the on-chain whitelist and
//! submits join transactions, keeping a local read model in step with the
//! chain.

pub mod blockchain;
pub mod config;
pub mod observability;
pub mod session;

pub use config::schema::AppConfig;
pub use session::{Reconnector, WhitelistSession};
