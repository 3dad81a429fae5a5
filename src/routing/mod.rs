//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path, caller privileges)
//!     → template.rs (split path, match typed segments)
//!     → router.rs (pick most specific template)
//!     → privilege.rs (authorize verb against alternatives)
//!     → Return: Resolved resource + params, NotFound,
//!       MethodNotAllowed or Forbidden
//!
//! Registration (at startup):
//!     Resource[]
//!     → parse templates, reject duplicate shapes
//!     → freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Deterministic: same input always resolves the same way
//! - Authorization runs before any handler code

pub mod privilege;
pub mod resource;
pub mod router;
pub mod template;

use thiserror::Error;

pub use privilege::{EntityPrivileges, PrivilegeSet};
pub use resource::{RequestContext, Resource};
pub use router::{Resolution, Router};
pub use template::{ParamValue, PathParams, Template};

/// Registration failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid template {template}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("template {template} overlaps {existing}")]
    Ambiguous { template: String, existing: String },
}
