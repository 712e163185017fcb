//! Chain verification for wallet connections.

use crate::blockchain::types::{ChainId, ConnectionHandle, WhitelistError, WhitelistResult};
use crate::observability::metrics;

/// Asserts a connection is attached to the one chain the session targets.
///
/// Nothing is cached: the wallet can switch networks under an existing
/// handle, so every check reads the chain id again.
#[derive(Debug, Clone, Copy)]
pub struct NetworkValidator {
    required: ChainId,
}

impl NetworkValidator {
    pub fn new(required: ChainId) -> Self {
        Self { required }
    }

    pub fn required(&self) -> ChainId {
        self.required
    }

    /// Fail with `WrongNetwork` unless `handle` is on the required chain.
    pub async fn assert_chain(&self, handle: &ConnectionHandle) -> WhitelistResult<()> {
        assert_chain(handle, self.required).await
    }
}

/// Fail with `WrongNetwork` unless `handle` is on `required`.
pub async fn assert_chain(handle: &ConnectionHandle, required: ChainId) -> WhitelistResult<()> {
    let actual = handle.chain_id().await?;
    let matches = actual == required;
    metrics::record_chain_check(matches);

    if !matches {
        tracing::warn!(
            actual = %actual,
            required = %required,
            "Wallet is on the wrong network"
        );
        return Err(WhitelistError::WrongNetwork { actual, required });
    }

    tracing::debug!(chain_id = %actual, "Chain verified");
    Ok(())
}
