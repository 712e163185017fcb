//! Transaction submission and confirmation monitoring.
//!
//! # Responsibilities
//! - Hand a write call to the wallet for signing and broadcast
//! - Poll until the transaction is mined
//! - Report a revert once, without retrying

use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::time::{interval, MissedTickBehavior};

use crate::blockchain::binding::{BindingMode, ContractBinding, ContractCall};
use crate::blockchain::types::{
    ConnectionHandle, TransactionReceipt, WhitelistError, WhitelistResult,
};
use crate::observability::metrics;

/// A transaction the wallet has broadcast but that is not yet known mined.
///
/// Consumed by [`TransactionTracker::wait`], so a receipt is read exactly once.
#[derive(Debug)]
pub struct PendingTransaction {
    tx_hash: TxHash,
    function: &'static str,
    handle: ConnectionHandle,
}

impl PendingTransaction {
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub fn function(&self) -> &'static str {
        self.function
    }
}

/// Submits write calls and waits for them to be mined.
#[derive(Debug, Clone)]
pub struct TransactionTracker {
    poll_interval: Duration,
}

impl TransactionTracker {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Send `call` through the writer binding's wallet.
    ///
    /// Resolves once the wallet returns a transaction hash. Fails with
    /// `UserRejected` if the user declines to sign.
    pub async fn submit(
        &self,
        binding: &ContractBinding,
        call: ContractCall,
    ) -> WhitelistResult<PendingTransaction> {
        if binding.mode() != BindingMode::Write {
            return Err(WhitelistError::SigningCapabilityRequired);
        }

        let handle = binding.handle().clone();
        let tx_hash = match handle.link().send_transaction(call.to, call.input).await {
            Ok(hash) => hash,
            Err(e) => {
                metrics::record_transaction(e.kind());
                tracing::warn!(function = call.function, error = %e, "Transaction not submitted");
                return Err(e);
            }
        };

        metrics::record_transaction("submitted");
        tracing::info!(function = call.function, tx_hash = %tx_hash, "Transaction submitted");

        Ok(PendingTransaction {
            tx_hash,
            function: call.function,
            handle,
        })
    }

    /// Wait until `pending` is mined.
    ///
    /// Fails with `TransactionReverted` if execution failed on-chain. There is
    /// no timeout here; the wallet/RPC layer's own limits apply.
    pub async fn wait(&self, pending: PendingTransaction) -> WhitelistResult<TransactionReceipt> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let receipt = loop {
            ticker.tick().await;

            match pending.handle.link().receipt(pending.tx_hash).await? {
                Some(receipt) => break receipt,
                None => {
                    tracing::debug!(tx_hash = %pending.tx_hash, "Transaction pending");
                }
            }
        };

        if !receipt.success {
            metrics::record_transaction("reverted");
            tracing::warn!(
                function = pending.function,
                tx_hash = %pending.tx_hash,
                block_number = ?receipt.block_number,
                "Transaction reverted"
            );
            return Err(WhitelistError::TransactionReverted(pending.tx_hash));
        }

        metrics::record_transaction("confirmed");
        tracing::info!(
            function = pending.function,
            tx_hash = %pending.tx_hash,
            block_number = ?receipt.block_number,
            "Transaction confirmed"
        );
        Ok(receipt)
    }
}
