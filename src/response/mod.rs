//! Response document subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway::handle
//!     → AsyncResp::new (pending = 1, owns the Response document)
//!     → handler issues BusCalls (pending += 1 each, synchronously)
//!     → continuations mutate the document under its lock
//!     → messages.rs records errors in a uniform shape
//!     → last release (pending 1 → 0) runs on_final hooks
//!     → Completion resolves with the finished Response
//! ```
//!
//! # Design Decisions
//! - One document per request; never shared across requests
//! - Finalization happens exactly once, on the 1 → 0 transition
//! - Status is decided by the first error class recorded

pub mod async_resp;
pub mod messages;

use axum::http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

pub use async_resp::{AsyncResp, Completion, Continuation, PendingGuard};

/// In-progress (and finally, finished) response document.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl Response {
    pub fn new(json: Value) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            json,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// True once any error has been recorded.
    pub fn has_error(&self) -> bool {
        self.json.get("error").is_some()
    }

    /// Append `item` to the array at `key`, creating it if needed.
    pub fn push(&mut self, key: &str, item: Value) {
        let slot = &mut self.json[key];
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            items.push(item);
        }
    }
}
