//! Per-request spans.
//!
//! Every request span carries the `x-request-id` set by the request-id
//! layer, so log lines of one request (including its bus calls) can be
//! correlated.

use axum::body::Body;
use axum::http::Request;
use tracing::Span;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id header value, `"unknown"` when absent or not UTF-8.
pub fn request_id<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span factory for `TraceLayer::make_span_with`.
pub fn request_span(req: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(req),
        method = %req.method(),
        path = %req.uri().path(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_fallback() {
        let req = Request::builder().uri("/redfish").body(()).unwrap();
        assert_eq!(request_id(&req), "unknown");
        let req = Request::builder()
            .uri("/redfish")
            .header(REQUEST_ID_HEADER, "abc")
            .body(())
            .unwrap();
        assert_eq!(request_id(&req), "abc");
    }
}
