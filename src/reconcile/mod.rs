//! List reconciliation for PATCHed array properties.
//!
//! # Data Flow
//! ```text
//! PATCH body array (client list)
//!     + backend entry ids (identity order)
//!     → engine.rs (positional walk: null = delete, {} = keep,
//!       object = update or create)
//!     → ipv4.rs / ipv6.rs (per-item validation)
//!     → Plan { actions, error }
//!     → resource handler issues one bus call per action
//! ```
//!
//! # Design Decisions
//! - Any invalid position stops the walk; earlier actions still apply
//! - Schemas validate items, the engine owns the walk

pub mod engine;
pub mod ipv4;
pub mod ipv6;

pub use engine::{reconcile, Action, EntrySchema, Plan};
pub use ipv4::{Ipv4Patch, Ipv4Static};
pub use ipv6::{Ipv6Patch, Ipv6Static};
