//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Bus → Resource tree → Accounts + watcher → Metrics → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server stops accepting → in-flight requests drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Account reloads come from the file watcher, not from signals

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartupError};
