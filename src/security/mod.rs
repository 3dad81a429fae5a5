//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http/auth.rs (Basic credentials from the Authorization header)
//!     → accounts.rs (username/password → role → privilege set)
//!     → routing (privileges checked per verb)
//!
//! On config reload:
//!     watcher → AccountStore::from_config → ArcSwap::store
//! ```
//!
//! # Design Decisions
//! - No credentials means anonymous, not rejected; resources decide
//! - Wrong credentials are always rejected with 401
//! - The account table is swapped whole, never edited in place

pub mod accounts;

pub use accounts::{AccountStore, Caller, Role};
