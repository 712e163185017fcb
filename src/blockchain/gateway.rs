//! Wallet connection gateway.
//!
//! # Responsibilities
//! - Obtain a connection from the wallet-selection capability
//! - Hold exactly one handle for the life of the session
//! - Coalesce concurrent connect calls onto one wallet prompt
//!
//! # State Transitions
//! ```text
//! Empty → Pending: first connect() starts a wallet prompt
//! Pending → Ready: prompt succeeded, handle cached
//! Pending → Empty: prompt failed, next connect() prompts again
//! Ready → Empty: release()
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::blockchain::types::{ConnectionHandle, WalletLink, WhitelistError, WhitelistResult};

/// The external wallet-selection widget, reduced to its one capability.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Prompt the user to pick and authorize a wallet.
    ///
    /// Fails with `ConnectionRejected` if the user declines, or
    /// `NoWalletAvailable` if no compatible wallet is present.
    async fn request_connection(&self) -> WhitelistResult<Arc<dyn WalletLink>>;
}

type ConnectAttempt = Shared<BoxFuture<'static, WhitelistResult<ConnectionHandle>>>;

enum Slot {
    Empty,
    Pending(ConnectAttempt),
    Ready(ConnectionHandle),
}

/// Owner of the session's single wallet connection.
pub struct ProviderGateway {
    connector: Arc<dyn WalletConnector>,
    slot: Mutex<Slot>,
}

impl ProviderGateway {
    pub fn new(connector: Arc<dyn WalletConnector>) -> Self {
        Self {
            connector,
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Return the held handle, or obtain one through the wallet.
    ///
    /// Callers arriving while a prompt is in flight wait on that same prompt.
    pub async fn connect(&self) -> WhitelistResult<ConnectionHandle> {
        let attempt = {
            let mut slot = self.lock();
            match &*slot {
                Slot::Ready(handle) => return Ok(handle.clone()),
                Slot::Pending(attempt) => attempt.clone(),
                Slot::Empty => {
                    tracing::info!("Requesting wallet connection");
                    let connector = Arc::clone(&self.connector);
                    let attempt = async move {
                        let link = connector.request_connection().await?;
                        Ok::<_, WhitelistError>(ConnectionHandle::new(link))
                    }
                    .boxed()
                    .shared();
                    *slot = Slot::Pending(attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.clone().await;

        let mut slot = self.lock();
        if matches!(&*slot, Slot::Pending(current) if current.ptr_eq(&attempt)) {
            *slot = match &result {
                Ok(handle) => {
                    tracing::info!(
                        capability = ?handle.capability(),
                        address = ?handle.address(),
                        "Wallet connected"
                    );
                    Slot::Ready(handle.clone())
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Wallet connection failed");
                    Slot::Empty
                }
            };
        }
        result
    }

    /// The held handle, without prompting.
    pub fn current(&self) -> Option<ConnectionHandle> {
        match &*self.lock() {
            Slot::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Drop the held handle. The next `connect()` prompts again.
    pub fn release(&self) {
        let mut slot = self.lock();
        if !matches!(&*slot, Slot::Empty) {
            tracing::info!("Wallet connection released");
        }
        *slot = Slot::Empty;
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // The slot is only ever replaced whole, so a poisoned value is still consistent.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.lock() {
            Slot::Empty => "empty",
            Slot::Pending(_) => "pending",
            Slot::Ready(_) => "ready",
        };
        f.debug_struct("ProviderGateway").field("state", &state).finish()
    }
}
