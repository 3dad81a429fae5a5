//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to startup, which builds the bus, router and accounts
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → startup swaps the account table (ArcSwap)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only accounts are hot-reloaded; the resource tree and bus are fixed
//!   for the life of the process

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AccountConfig, BusConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, SecurityConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
