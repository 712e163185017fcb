//! Reconnect subscriber.
//!
//! The only consumer that decides whether the session re-enters
//! `Connecting`. It reacts to one event: the session entering `Error`.
//! A session that falls back to `Disconnected` (rejected prompt, wrong
//! network) is left alone, so the user is never re-prompted in a loop.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::session::machine::WhitelistSession;
use crate::session::state::{SessionEvent, SessionPhase};

pub struct Reconnector {
    session: Weak<WhitelistSession>,
    events: broadcast::Receiver<SessionEvent>,
}

impl Reconnector {
    /// Subscribe now, so no event emitted after this call is missed.
    pub fn new(session: &Arc<WhitelistSession>) -> Self {
        Self {
            session: Arc::downgrade(session),
            events: session.subscribe(),
        }
    }

    pub fn wants_reconnect(event: &SessionEvent) -> bool {
        matches!(
            event,
            SessionEvent::PhaseChanged {
                to: SessionPhase::Error,
                ..
            }
        )
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the session is dropped.
    pub async fn run(mut self) {
        loop {
            let event = match self.events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Reconnector lagged behind session events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !Self::wants_reconnect(&event) {
                continue;
            }
            let Some(session) = self.session.upgrade() else {
                break;
            };

            tracing::info!(session_id = %session.id(), "Session in error state, reconnecting");
            match session.connect().await {
                Ok(state) => {
                    tracing::info!(session_id = %session.id(), ?state, "Session reconnected");
                }
                Err(e) => {
                    tracing::debug!(session_id = %session.id(), error = %e, "Reconnect failed");
                }
            }
        }
    }
}
