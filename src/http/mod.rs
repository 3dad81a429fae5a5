//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace span, timeout, body limit)
//!     → auth.rs (Basic credentials → caller or 401)
//!     → request.rs (body bytes + caller → GatewayRequest)
//!     → Gateway::handle
//!     → response.rs (document → JSON, headers, no body for HEAD/204)
//!     → Send to client
//! ```

pub mod auth;
pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
