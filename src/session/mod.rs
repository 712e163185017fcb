//! Whitelist session subsystem.
//!
//! # Data Flow
//! ```text
//! ProviderGateway → NetworkValidator → ContractBinding (reads)
//!                                    → TransactionTracker (join)
//!     → machine.rs (phase transitions, SessionState)
//!     → state.rs (watch snapshots + broadcast events)
//!     → reconnect.rs (re-enters Connecting after Error)
//! ```

pub mod machine;
pub mod reconnect;
pub mod state;

pub use machine::{SessionSettings, WhitelistSession};
pub use reconnect::Reconnector;
pub use state::{SessionEvent, SessionPhase, SessionSnapshot, SessionState};
