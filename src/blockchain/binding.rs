//! Typed binding to the deployed Whitelist contract.
//!
//! # Responsibilities
//! - Carry the contract's interface description (`IWhitelist`)
//! - ABI-encode calls and decode their return data
//! - Distinguish reader and writer bindings
//!
//! Chain and capability policy belong to the callers; a binding only checks
//! that a writer sits on a signing-capable handle.

use alloy::primitives::{Address, Bytes};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::types::{Capability, ConnectionHandle, WhitelistError, WhitelistResult};
use crate::observability::metrics;

sol! {
    /// Call surface of the deployed Whitelist contract.
    #[derive(Debug)]
    interface IWhitelist {
        /// Adds the caller. Reverts if already whitelisted or the cap is reached.
        function addAddressToWhitelist() external;

        function numAddressesWhitelisted() external view returns (uint256);

        function whitelistedAddresses(address account) external view returns (bool);

        function maxWhitelistedAddresses() external view returns (uint256);
    }
}

/// Which handle capability a binding is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    Read,
    Write,
}

/// An encoded state-changing call, ready for the transaction tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub input: Bytes,
    pub function: &'static str,
}

/// (contract address, interface) bound to one connection handle.
///
/// Derived from the handle; rebuild it whenever the handle changes.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    handle: ConnectionHandle,
    address: Address,
    mode: BindingMode,
}

impl ContractBinding {
    /// Bind the Whitelist interface at `address`.
    ///
    /// `Write` requires a handle that can sign.
    pub fn bind(
        handle: &ConnectionHandle,
        address: Address,
        mode: BindingMode,
    ) -> WhitelistResult<Self> {
        if mode == BindingMode::Write && handle.capability() != Capability::ReadSign {
            return Err(WhitelistError::SigningCapabilityRequired);
        }
        Ok(Self {
            handle: handle.clone(),
            address,
            mode,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// `numAddressesWhitelisted()`
    pub async fn num_addresses_whitelisted(&self) -> WhitelistResult<u64> {
        let count = self
            .read(IWhitelist::numAddressesWhitelistedCall {})
            .await?;
        u64::try_from(count)
            .map_err(|_| WhitelistError::RpcFailure(format!("whitelist count {} out of range", count)))
    }

    /// `whitelistedAddresses(account)`
    pub async fn whitelisted_addresses(&self, account: Address) -> WhitelistResult<bool> {
        self.read(IWhitelist::whitelistedAddressesCall { account })
            .await
    }

    /// `maxWhitelistedAddresses()`
    pub async fn max_whitelisted_addresses(&self) -> WhitelistResult<u64> {
        let max = self
            .read(IWhitelist::maxWhitelistedAddressesCall {})
            .await?;
        u64::try_from(max)
            .map_err(|_| WhitelistError::RpcFailure(format!("whitelist cap {} out of range", max)))
    }

    /// Encode `addAddressToWhitelist()` for submission. Writer bindings only.
    pub fn add_address_to_whitelist(&self) -> WhitelistResult<ContractCall> {
        if self.mode != BindingMode::Write {
            return Err(WhitelistError::SigningCapabilityRequired);
        }
        Ok(ContractCall {
            to: self.address,
            input: IWhitelist::addAddressToWhitelistCall {}.abi_encode().into(),
            function: IWhitelist::addAddressToWhitelistCall::SIGNATURE,
        })
    }

    async fn read<C: SolCall>(&self, call: C) -> WhitelistResult<C::Return> {
        let result = self
            .handle
            .link()
            .call(self.address, call.abi_encode().into())
            .await
            .and_then(|output| {
                C::abi_decode_returns(&output).map_err(|e| {
                    WhitelistError::RpcFailure(format!("could not decode {}: {}", C::SIGNATURE, e))
                })
            });

        metrics::record_read(C::SIGNATURE, result.is_ok());
        if let Err(e) = &result {
            tracing::debug!(call = C::SIGNATURE, error = %e, "Contract read failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::{ChainId, TransactionReceipt, WalletLink};
    use alloy::primitives::{TxHash, U256};
    use alloy::sol_types::SolValue;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedLink {
        signer: Option<Address>,
        output: Bytes,
    }

    #[async_trait]
    impl WalletLink for FixedLink {
        async fn chain_id(&self) -> WhitelistResult<ChainId> {
            Ok(ChainId(5))
        }

        fn signer(&self) -> Option<Address> {
            self.signer
        }

        async fn call(&self, _to: Address, _input: Bytes) -> WhitelistResult<Bytes> {
            Ok(self.output.clone())
        }

        async fn send_transaction(&self, _to: Address, _input: Bytes) -> WhitelistResult<TxHash> {
            Ok(TxHash::ZERO)
        }

        async fn receipt(&self, _tx_hash: TxHash) -> WhitelistResult<Option<TransactionReceipt>> {
            Ok(None)
        }
    }

    fn handle(signer: Option<Address>, output: Vec<u8>) -> ConnectionHandle {
        ConnectionHandle::new(Arc::new(FixedLink {
            signer,
            output: output.into(),
        }))
    }

    #[test]
    fn test_write_requires_signer() {
        let contract = Address::repeat_byte(0xaa);
        let read_only = handle(None, Vec::new());

        assert!(ContractBinding::bind(&read_only, contract, BindingMode::Read).is_ok());
        assert_eq!(
            ContractBinding::bind(&read_only, contract, BindingMode::Write).unwrap_err(),
            WhitelistError::SigningCapabilityRequired
        );

        let signing = handle(Some(Address::repeat_byte(0x01)), Vec::new());
        let writer = ContractBinding::bind(&signing, contract, BindingMode::Write).unwrap();
        assert_eq!(writer.mode(), BindingMode::Write);
    }

    #[test]
    fn test_reader_cannot_encode_writes() {
        let signing = handle(Some(Address::repeat_byte(0x01)), Vec::new());
        let reader =
            ContractBinding::bind(&signing, Address::repeat_byte(0xaa), BindingMode::Read).unwrap();
        assert_eq!(
            reader.add_address_to_whitelist().unwrap_err(),
            WhitelistError::SigningCapabilityRequired
        );
    }

    #[test]
    fn test_join_call_encoding() {
        let contract = Address::repeat_byte(0xaa);
        let signing = handle(Some(Address::repeat_byte(0x01)), Vec::new());
        let writer = ContractBinding::bind(&signing, contract, BindingMode::Write).unwrap();

        let call = writer.add_address_to_whitelist().unwrap();
        assert_eq!(call.to, contract);
        assert_eq!(call.function, "addAddressToWhitelist()");
        assert_eq!(
            call.input.as_ref(),
            IWhitelist::addAddressToWhitelistCall::SELECTOR.as_slice()
        );
    }

    #[tokio::test]
    async fn test_decodes_count() {
        let h = handle(None, U256::from(3u64).abi_encode());
        let reader = ContractBinding::bind(&h, Address::repeat_byte(0xaa), BindingMode::Read).unwrap();
        assert_eq!(reader.num_addresses_whitelisted().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_malformed_return_is_rpc_failure() {
        let h = handle(None, vec![0x01, 0x02]);
        let reader = ContractBinding::bind(&h, Address::repeat_byte(0xaa), BindingMode::Read).unwrap();
        let err = reader
            .whitelisted_addresses(Address::repeat_byte(0x01))
            .await
            .unwrap_err();
        assert!(matches!(err, WhitelistError::RpcFailure(_)));
    }
}
