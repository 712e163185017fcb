//! Shared utilities for integration tests: an in-memory chain running the
//! Whitelist contract, and a wallet connector attached to it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use tokio::sync::Notify;

use whitelist_dapp::blockchain::binding::IWhitelist;
use whitelist_dapp::blockchain::{
    ChainId, ProviderGateway, TransactionReceipt, WalletConnector, WalletLink, WhitelistError,
    WhitelistResult,
};
use whitelist_dapp::session::{SessionSettings, WhitelistSession};

pub const REQUIRED_CHAIN: u64 = 5;

pub fn contract() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn user() -> Address {
    Address::repeat_byte(0x11)
}

struct ChainState {
    chain_id: u64,
    max: u64,
    members: HashSet<Address>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    sent: u32,
    block: u64,
    reject_signatures: bool,
    fail_reads: bool,
    hold_receipts: bool,
}

/// A single-contract chain.
pub struct MockChain {
    state: Mutex<ChainState>,
    send_gate: Mutex<Option<Arc<Notify>>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockChain {
    pub fn new(chain_id: u64, max: u64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChainState {
                chain_id,
                max,
                members: HashSet::new(),
                receipts: HashMap::new(),
                sent: 0,
                block: 100,
                reject_signatures: false,
                fail_reads: false,
                hold_receipts: false,
            }),
            send_gate: Mutex::new(None),
            read_gate: Mutex::new(None),
        })
    }

    /// Whitelist `count` unrelated addresses.
    pub fn with_members(self: Arc<Self>, count: u8) -> Arc<Self> {
        {
            let mut state = self.state.lock().unwrap();
            for i in 0..count {
                state.members.insert(Address::repeat_byte(0xa0 + i));
            }
        }
        self
    }

    pub fn add_member(&self, account: Address) {
        self.state.lock().unwrap().members.insert(account);
    }

    pub fn is_member(&self, account: Address) -> bool {
        self.state.lock().unwrap().members.contains(&account)
    }

    pub fn member_count(&self) -> usize {
        self.state.lock().unwrap().members.len()
    }

    pub fn switch_chain(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn reject_signatures(&self, reject: bool) {
        self.state.lock().unwrap().reject_signatures = reject;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// While held, mined transactions report no receipt yet.
    pub fn hold_receipts(&self, hold: bool) {
        self.state.lock().unwrap().hold_receipts = hold;
    }

    /// Transactions the wallet actually broadcast.
    pub fn sent(&self) -> u32 {
        self.state.lock().unwrap().sent
    }

    /// Hold every `send_transaction` until the returned notify fires.
    pub fn gate_sends(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.send_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold every contract read until [`MockChain::open_reads`].
    pub fn gate_reads(&self) {
        *self.read_gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Release the reads held so far and stop holding new ones.
    pub fn open_reads(&self) {
        if let Some(gate) = self.read_gate.lock().unwrap().take() {
            gate.notify_waiters();
        }
    }

    fn execute(&self, from: Address, input: &[u8]) -> WhitelistResult<TxHash> {
        let mut state = self.state.lock().unwrap();
        if input != IWhitelist::addAddressToWhitelistCall::SELECTOR.as_slice() {
            return Err(WhitelistError::RpcFailure("unknown function".to_string()));
        }

        state.sent += 1;
        state.block += 1;
        let tx_hash = TxHash::with_last_byte(state.sent as u8);

        let success = !state.members.contains(&from) && (state.members.len() as u64) < state.max;
        if success {
            state.members.insert(from);
        }
        let block_number = Some(state.block);
        state.receipts.insert(
            tx_hash,
            TransactionReceipt {
                tx_hash,
                block_number,
                success,
            },
        );
        Ok(tx_hash)
    }
}

/// Wallet link onto a [`MockChain`].
pub struct MockLink {
    chain: Arc<MockChain>,
    signer: Option<Address>,
}

#[async_trait]
impl WalletLink for MockLink {
    async fn chain_id(&self) -> WhitelistResult<ChainId> {
        Ok(ChainId(self.chain.state.lock().unwrap().chain_id))
    }

    fn signer(&self) -> Option<Address> {
        self.signer
    }

    async fn call(&self, to: Address, input: Bytes) -> WhitelistResult<Bytes> {
        let gate = self.chain.read_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let state = self.chain.state.lock().unwrap();
        if state.fail_reads {
            return Err(WhitelistError::RpcFailure("connection reset".to_string()));
        }
        if to != contract() {
            return Ok(Bytes::new());
        }

        let selector = input.get(..4).unwrap_or_default();
        if selector == IWhitelist::numAddressesWhitelistedCall::SELECTOR.as_slice() {
            return Ok(U256::from(state.members.len()).abi_encode().into());
        }
        if selector == IWhitelist::whitelistedAddressesCall::SELECTOR.as_slice() {
            let call = IWhitelist::whitelistedAddressesCall::abi_decode(&input)
                .map_err(|e| WhitelistError::RpcFailure(e.to_string()))?;
            return Ok(state.members.contains(&call.account).abi_encode().into());
        }
        if selector == IWhitelist::maxWhitelistedAddressesCall::SELECTOR.as_slice() {
            return Ok(U256::from(state.max).abi_encode().into());
        }
        Err(WhitelistError::RpcFailure("execution reverted".to_string()))
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> WhitelistResult<TxHash> {
        let from = self.signer.ok_or(WhitelistError::SigningCapabilityRequired)?;

        let gate = self.chain.send_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.chain.state.lock().unwrap().reject_signatures {
            return Err(WhitelistError::UserRejected);
        }
        if to != contract() {
            return Err(WhitelistError::RpcFailure("no contract at address".to_string()));
        }
        self.chain.execute(from, &input)
    }

    async fn receipt(&self, tx_hash: TxHash) -> WhitelistResult<Option<TransactionReceipt>> {
        let state = self.chain.state.lock().unwrap();
        if state.hold_receipts {
            return Ok(None);
        }
        Ok(state.receipts.get(&tx_hash).cloned())
    }
}

/// Hands out [`MockLink`]s and counts how often the user was prompted.
pub struct MockConnector {
    chain: Arc<MockChain>,
    signer: Option<Address>,
    prompts: AtomicU32,
    outcome: Mutex<Option<WhitelistError>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockConnector {
    pub fn new(chain: Arc<MockChain>, signer: Option<Address>) -> Arc<Self> {
        Arc::new(Self {
            chain,
            signer,
            prompts: AtomicU32::new(0),
            outcome: Mutex::new(None),
            gate: Mutex::new(None),
        })
    }

    pub fn prompts(&self) -> u32 {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Make the next prompts fail with `error` (None restores success).
    pub fn fail_with(&self, error: Option<WhitelistError>) {
        *self.outcome.lock().unwrap() = error;
    }

    /// Hold every prompt until the returned notify fires.
    pub fn gate_prompts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl WalletConnector for MockConnector {
    async fn request_connection(&self) -> WhitelistResult<Arc<dyn WalletLink>> {
        self.prompts.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = self.outcome.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(Arc::new(MockLink {
            chain: self.chain.clone(),
            signer: self.signer,
        }))
    }
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        required_chain: ChainId(REQUIRED_CHAIN),
        contract: contract(),
        receipt_poll_interval: Duration::from_millis(1),
    }
}

/// A session for `user()` on `chain`.
pub fn session(chain: &Arc<MockChain>) -> (Arc<WhitelistSession>, Arc<MockConnector>) {
    session_with_signer(chain, Some(user()))
}

pub fn session_with_signer(
    chain: &Arc<MockChain>,
    signer: Option<Address>,
) -> (Arc<WhitelistSession>, Arc<MockConnector>) {
    let connector = MockConnector::new(chain.clone(), signer);
    let gateway = ProviderGateway::new(connector.clone());
    (Arc::new(WhitelistSession::new(gateway, settings())), connector)
}
