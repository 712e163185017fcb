//! Session read model.
//!
//! # States
//! ```text
//! Disconnected → Connecting → Idle ⇄ Submitting → Confirming → Idle
//!                    │        Idle ⇄ Refreshing
//!                    └→ Disconnected
//! Refreshing | Submitting | Confirming → Error (mid-operation chain mismatch)
//! Error → Connecting (reconnect)
//! ```
//!
//! `Idle`, `Refreshing`, `Submitting`, `Confirming` and `Error` are the
//! connected sub-states.

use std::fmt;

use serde::Serialize;

use crate::blockchain::types::WhitelistError;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Idle,
    Refreshing,
    Submitting,
    Confirming,
    Error,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Idle => "idle",
            Self::Refreshing => "refreshing",
            Self::Submitting => "submitting",
            Self::Confirming => "confirming",
            Self::Error => "error",
        }
    }

    /// A join is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::Confirming)
    }

    /// An operation on a connected session owns it until it settles.
    pub fn is_claimed(&self) -> bool {
        self.is_busy() || *self == Self::Refreshing
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the rest of the system observes about the whitelist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// A validated connection is held.
    pub connected: bool,
    /// The connected address is on the whitelist. Only set from a mined
    /// join receipt or a membership read.
    pub joined: bool,
    /// A join is in flight.
    pub pending: bool,
    /// Last count read from the contract. Never incremented locally.
    pub whitelisted_count: u64,
}

/// Phase and state, published together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub state: SessionState,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            state: SessionState::default(),
        }
    }
}

/// Emitted by the session as it moves; consumed by the reconnect subscriber
/// and any presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    Failed(WhitelistError),
}
