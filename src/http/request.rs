//! Incoming request to gateway request.
//!
//! # Responsibilities
//! - Read the (size-limited) body
//! - Attach the authenticated caller's name and privileges
//!
//! # Design Decisions
//! - Only the path is routed; the query string is ignored
//! - Anonymous callers carry an empty privilege set

use axum::body::{Body, Bytes};
use axum::http::request::Parts;

use crate::gateway::GatewayRequest;
use crate::security::Caller;

/// Build the gateway view of a request.
pub fn gateway_request(parts: &Parts, body: Bytes, caller: Option<Caller>) -> GatewayRequest {
    let request = GatewayRequest::new(parts.method.clone(), parts.uri.path()).with_body(body);
    match caller {
        Some(caller) => request.as_user(caller.username, caller.privileges),
        None => request,
    }
}

/// Collect the body; fails once it exceeds the configured limit.
pub async fn read_body(body: Body) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(body, usize::MAX).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Role;
    use axum::http::{Method, Request};

    #[test]
    fn test_query_string_not_routed() {
        let (parts, _) = Request::builder()
            .method(Method::GET)
            .uri("/redfish/v1/Systems?$expand=.")
            .body(())
            .unwrap()
            .into_parts();
        let caller = Caller {
            username: "root".into(),
            role: Role::ReadOnly,
            privileges: Role::ReadOnly.privileges(),
        };
        let req = gateway_request(&parts, Bytes::new(), Some(caller));
        assert_eq!(req.path, "/redfish/v1/Systems");
        assert_eq!(req.username.as_deref(), Some("root"));
        assert!(req.privileges.contains("Login"));
    }
}
