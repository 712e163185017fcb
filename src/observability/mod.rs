//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway / validator / binding / tracker / session produce:
//!     → logging.rs (structured log events on stderr)
//!     → metrics.rs (counters through the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - `session_id` span field flows through every session operation
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
