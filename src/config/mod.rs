//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → CLI flags override individual fields
//!     → SessionSettings / deploy request
//! ```
//!
//! # Design Decisions
//! - Config is static for the life of the process; nothing is discovered
//!   from the chain
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::AppConfig;
pub use schema::NetworkConfig;
pub use schema::ObservabilityConfig;
pub use schema::WalletConfig;
pub use schema::WhitelistConfig;
