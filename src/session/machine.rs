//! Whitelist session state machine.
//!
//! # Responsibilities
//! - Drive connect → validate → read → (join → confirm → resync)
//! - Keep at most one join in flight
//! - Publish phase and state to observers
//!
//! # Design Decisions
//! - The phase check and the transition into a phase happen in one update
//!   of the watch channel, so two callers cannot both enter `Submitting`
//! - An operation leaves only the phase it claimed; a late result never
//!   overwrites the phase or `pending` of a newer operation
//! - Every exit from `Submitting`/`Confirming` clears `pending`, including a
//!   dropped join future
//! - `joined` and `whitelisted_count` only ever come from the chain

use std::time::Duration;

use alloy::primitives::Address;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::blockchain::binding::{BindingMode, ContractBinding};
use crate::blockchain::gateway::ProviderGateway;
use crate::blockchain::tracker::TransactionTracker;
use crate::blockchain::types::{
    ChainId, ConnectionHandle, TransactionReceipt, WhitelistError, WhitelistResult,
};
use crate::blockchain::validator::NetworkValidator;
use crate::config::{AppConfig, ConfigError};
use crate::observability::metrics;
use crate::session::state::{SessionEvent, SessionPhase, SessionSnapshot, SessionState};

const EVENT_CAPACITY: usize = 64;

const CONNECT_PHASES: &[SessionPhase] = &[SessionPhase::Connecting];
const REFRESH_PHASES: &[SessionPhase] = &[SessionPhase::Refreshing];
const JOIN_PHASES: &[SessionPhase] = &[SessionPhase::Submitting, SessionPhase::Confirming];

/// Static inputs a session needs besides its wallet connector.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub required_chain: ChainId,
    pub contract: Address,
    pub receipt_poll_interval: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            required_chain: config.required_chain(),
            contract: config.contract_address()?,
            receipt_poll_interval: config.receipt_poll_interval(),
        })
    }
}

/// One client's interaction with the whitelist contract.
pub struct WhitelistSession {
    id: Uuid,
    gateway: ProviderGateway,
    validator: NetworkValidator,
    tracker: TransactionTracker,
    contract: Address,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl WhitelistSession {
    pub fn new(gateway: ProviderGateway, settings: SessionSettings) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let id = Uuid::new_v4();

        tracing::info!(
            session_id = %id,
            required_chain = %settings.required_chain,
            contract = %settings.contract,
            "Whitelist session created"
        );

        Self {
            id,
            gateway,
            validator: NetworkValidator::new(settings.required_chain),
            tracker: TransactionTracker::new(settings.receipt_poll_interval),
            contract: settings.contract,
            snapshots,
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        *self.snapshots.borrow()
    }

    pub fn phase(&self) -> SessionPhase {
        self.snapshots.borrow().phase
    }

    pub fn state(&self) -> SessionState {
        self.snapshots.borrow().state
    }

    /// Latest snapshot, updated on every change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Phase changes and surfaced failures.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Connect the wallet, verify the chain and read the whitelist.
    ///
    /// A wallet or chain failure returns the session to `Disconnected` with
    /// its state untouched. Read failures are logged and reported as events;
    /// the session still reaches `Idle` with the last known values.
    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    pub async fn connect(&self) -> WhitelistResult<SessionState> {
        self.try_enter(
            SessionPhase::Connecting,
            |snap| {
                if snap.phase.is_claimed() {
                    Err(WhitelistError::AlreadyPending)
                } else {
                    Ok(())
                }
            },
            |_| {},
        )?;
        let mut guard = SettleGuard::new(self, CONNECT_PHASES, SessionPhase::Disconnected, |s| {
            s.connected = false
        });

        let handle = match self.establish().await {
            Ok(handle) => handle,
            Err(e) => {
                guard.disarm();
                self.settle(CONNECT_PHASES, SessionPhase::Disconnected, |s| {
                    s.connected = false
                });
                self.report(&e);
                return Err(e);
            }
        };

        let stale = self.sync(&handle, CONNECT_PHASES).await;
        guard.disarm();
        if let Some(e) = stale {
            // Already reported; connecting does not depend on the reads.
            tracing::debug!(session_id = %self.id, error = %e, "Connected with last known chain state");
        }
        Ok(self.state())
    }

    /// Re-verify the chain and re-read the whitelist from `Idle`.
    ///
    /// Holds the session in `Refreshing` until both reads finish, so no join
    /// can start underneath it.
    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    pub async fn refresh(&self) -> WhitelistResult<SessionState> {
        self.try_enter(
            SessionPhase::Refreshing,
            |snap| match snap.phase {
                SessionPhase::Idle => Ok(()),
                phase if phase.is_claimed() => Err(WhitelistError::AlreadyPending),
                _ => Err(WhitelistError::NotConnected),
            },
            |_| {},
        )?;

        let mut guard = SettleGuard::new(self, REFRESH_PHASES, SessionPhase::Idle, |_| {});
        let result = self.run_refresh().await;
        guard.disarm();
        result
    }

    /// Add the connected address to the whitelist and wait for it to be mined.
    ///
    /// Rejected with `AlreadyPending` while another operation owns the
    /// session and with `AlreadyJoined` once the address is a member.
    /// Failures return the session to `Idle` with `joined` unchanged, except a
    /// chain mismatch, which moves it to `Error`.
    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    pub async fn submit_join(&self) -> WhitelistResult<TransactionReceipt> {
        self.try_enter(
            SessionPhase::Submitting,
            |snap| match snap.phase {
                SessionPhase::Idle if snap.state.joined => Err(WhitelistError::AlreadyJoined),
                SessionPhase::Idle => Ok(()),
                phase if phase.is_claimed() => Err(WhitelistError::AlreadyPending),
                _ => Err(WhitelistError::NotConnected),
            },
            |s| s.pending = true,
        )?;

        let mut guard = SettleGuard::new(self, JOIN_PHASES, SessionPhase::Idle, |s| {
            s.pending = false
        });
        let result = self.run_join().await;
        guard.disarm();

        match result {
            Ok((receipt, count)) => {
                self.settle(JOIN_PHASES, SessionPhase::Idle, |s| {
                    s.pending = false;
                    s.joined = true;
                    if let Ok(count) = &count {
                        s.whitelisted_count = *count;
                    }
                });
                if let Err(e) = count {
                    self.report(&e);
                }
                Ok(receipt)
            }
            Err(e) => {
                if matches!(e, WhitelistError::WrongNetwork { .. }) {
                    self.settle(JOIN_PHASES, SessionPhase::Error, |s| {
                        s.pending = false;
                        s.connected = false;
                    });
                } else {
                    self.settle(JOIN_PHASES, SessionPhase::Idle, |s| s.pending = false);
                }
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Release the wallet connection and forget chain state.
    ///
    /// Refused while a connect, refresh or join is in flight.
    pub fn disconnect(&self) -> WhitelistResult<()> {
        self.try_enter(
            SessionPhase::Disconnected,
            |snap| {
                if snap.phase.is_claimed() || snap.phase == SessionPhase::Connecting {
                    Err(WhitelistError::AlreadyPending)
                } else {
                    Ok(())
                }
            },
            |s| *s = SessionState::default(),
        )?;
        self.gateway.release();
        Ok(())
    }

    async fn establish(&self) -> WhitelistResult<ConnectionHandle> {
        let handle = self.gateway.connect().await?;
        self.validator.assert_chain(&handle).await?;
        Ok(handle)
    }

    async fn run_refresh(&self) -> WhitelistResult<SessionState> {
        let Some(handle) = self.gateway.current() else {
            self.settle(REFRESH_PHASES, SessionPhase::Disconnected, |s| {
                s.connected = false
            });
            return Err(WhitelistError::NotConnected);
        };

        if let Err(e) = self.validator.assert_chain(&handle).await {
            if matches!(e, WhitelistError::WrongNetwork { .. }) {
                self.settle(REFRESH_PHASES, SessionPhase::Error, |s| s.connected = false);
            } else {
                self.settle(REFRESH_PHASES, SessionPhase::Idle, |_| {});
            }
            self.report(&e);
            return Err(e);
        }

        match self.sync(&handle, REFRESH_PHASES).await {
            Some(e) => Err(e),
            None => Ok(self.state()),
        }
    }

    /// Submit and confirm the join; returns the receipt and a fresh count.
    async fn run_join(&self) -> WhitelistResult<(TransactionReceipt, WhitelistResult<u64>)> {
        let handle = self.gateway.current().ok_or(WhitelistError::NotConnected)?;
        self.validator.assert_chain(&handle).await?;

        let writer = ContractBinding::bind(&handle, self.contract, BindingMode::Write)?;
        let call = writer.add_address_to_whitelist()?;
        let pending = self.tracker.submit(&writer, call).await?;

        self.settle(&[SessionPhase::Submitting], SessionPhase::Confirming, |_| {});
        let receipt = self.tracker.wait(pending).await?;

        let count = writer.num_addresses_whitelisted().await;
        Ok((receipt, count))
    }

    /// Run both reads concurrently, then leave `owner` for `Idle` with their
    /// results.
    async fn sync(
        &self,
        handle: &ConnectionHandle,
        owner: &[SessionPhase],
    ) -> Option<WhitelistError> {
        let (count, member) = self.read_chain_state(handle).await;

        self.settle(owner, SessionPhase::Idle, |s| {
            s.connected = true;
            if let Ok(count) = &count {
                s.whitelisted_count = *count;
            }
            if let Some(Ok(member)) = &member {
                s.joined = *member;
            }
        });

        let failures: Vec<WhitelistError> = [count.err(), member.and_then(Result::err)]
            .into_iter()
            .flatten()
            .collect();
        for e in &failures {
            self.report(e);
        }
        failures.into_iter().next()
    }

    async fn read_chain_state(
        &self,
        handle: &ConnectionHandle,
    ) -> (WhitelistResult<u64>, Option<WhitelistResult<bool>>) {
        let reader = match ContractBinding::bind(handle, self.contract, BindingMode::Read) {
            Ok(reader) => reader,
            Err(e) => return (Err(e), None),
        };

        let count = reader.num_addresses_whitelisted();
        let member = async {
            match handle.address() {
                Some(account) => Some(reader.whitelisted_addresses(account).await),
                None => None,
            }
        };
        tokio::join!(count, member)
    }

    /// Check the current snapshot and move to `to` in one update.
    fn try_enter(
        &self,
        to: SessionPhase,
        check: impl FnOnce(&SessionSnapshot) -> WhitelistResult<()>,
        update: impl FnOnce(&mut SessionState),
    ) -> WhitelistResult<()> {
        let mut outcome = Ok(());
        let mut from = to;
        self.snapshots.send_if_modified(|snap| {
            from = snap.phase;
            outcome = check(snap);
            if outcome.is_err() {
                return false;
            }
            snap.phase = to;
            update(&mut snap.state);
            true
        });

        match outcome {
            Ok(()) => {
                self.announce(from, to);
                Ok(())
            }
            Err(e) => {
                tracing::debug!(session_id = %self.id, phase = %from, error = %e, "Request refused");
                Err(e)
            }
        }
    }

    /// Move to `to` only while the session is still in one of `from`.
    fn settle(
        &self,
        from: &[SessionPhase],
        to: SessionPhase,
        update: impl FnOnce(&mut SessionState),
    ) -> bool {
        let mut left = None;
        self.snapshots.send_if_modified(|snap| {
            if !from.contains(&snap.phase) {
                return false;
            }
            left = Some(snap.phase);
            snap.phase = to;
            update(&mut snap.state);
            true
        });

        match left {
            Some(prev) => {
                self.announce(prev, to);
                true
            }
            None => {
                tracing::debug!(
                    session_id = %self.id,
                    phase = %self.phase(),
                    to = %to,
                    "Session moved on; result discarded"
                );
                false
            }
        }
    }

    fn announce(&self, from: SessionPhase, to: SessionPhase) {
        if from == to {
            return;
        }
        tracing::debug!(session_id = %self.id, from = %from, to = %to, "Session phase changed");
        metrics::record_phase_transition(to.as_str());
        let _ = self.events.send(SessionEvent::PhaseChanged { from, to });
    }

    fn report(&self, error: &WhitelistError) {
        tracing::warn!(
            session_id = %self.id,
            phase = %self.phase(),
            kind = error.kind(),
            error = %error,
            "Session operation failed"
        );
        let _ = self.events.send(SessionEvent::Failed(error.clone()));
    }
}

impl std::fmt::Debug for WhitelistSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhitelistSession")
            .field("id", &self.id)
            .field("contract", &self.contract)
            .field("required_chain", &self.validator.required())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Settles an operation whose future is dropped before it finishes.
struct SettleGuard<'a> {
    session: &'a WhitelistSession,
    from: &'static [SessionPhase],
    to: SessionPhase,
    update: fn(&mut SessionState),
    armed: bool,
}

impl<'a> SettleGuard<'a> {
    fn new(
        session: &'a WhitelistSession,
        from: &'static [SessionPhase],
        to: SessionPhase,
        update: fn(&mut SessionState),
    ) -> Self {
        Self {
            session,
            from,
            to,
            update,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(session_id = %self.session.id, to = %self.to, "Operation abandoned while in flight");
            self.session.settle(self.from, self.to, self.update);
        }
    }
}
