//! Redfish-style management gateway over a BMC object bus.

pub mod body;
pub mod bus;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod reconcile;
pub mod resources;
pub mod response;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayRequest};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
