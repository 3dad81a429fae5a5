//! Gateway response to HTTP response.
//!
//! # Responsibilities
//! - Serialize the JSON document
//! - Copy headers set by handlers (Location, Allow)
//! - Add the OData version header
//!
//! # Design Decisions
//! - HEAD and 204 responses carry headers only

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;

use crate::error::GatewayError;
use crate::response::{messages, Response};

pub const ODATA_VERSION: &str = "odata-version";

fn has_body(method: &Method, status: StatusCode) -> bool {
    *method != Method::HEAD && status != StatusCode::NO_CONTENT
}

pub fn into_http(res: Response, method: &Method) -> axum::response::Response {
    let body = if has_body(method, res.status) {
        match serde_json::to_vec(&res.json) {
            Ok(bytes) => Body::from(bytes),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                return (StatusCode::INTERNAL_SERVER_ERROR, "response serialization failed").into_response();
            }
        }
    } else {
        Body::empty()
    };

    let mut out = axum::response::Response::new(body);
    *out.status_mut() = res.status;
    let headers = out.headers_mut();
    headers.extend(res.headers);
    headers.insert(ODATA_VERSION, HeaderValue::from_static("4.0"));
    if has_body(method, res.status) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
    }
    out
}

/// Problem document for failures caught before the gateway runs.
pub fn problem(err: &GatewayError, method: &Method) -> axum::response::Response {
    let mut res = Response::default();
    messages::record(&mut res, err);
    if matches!(err, GatewayError::Unauthorized) {
        res.headers.insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"bmc-gateway\""),
        );
    }
    into_http(res, method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_head_and_no_content_have_no_body_type() {
        let res = Response::new(json!({"Id": "system"}));
        let out = into_http(res.clone(), &Method::HEAD);
        assert!(out.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(out.headers()[ODATA_VERSION], "4.0");

        let out = into_http(res, &Method::GET);
        assert_eq!(out.headers()[header::CONTENT_TYPE], "application/json; charset=utf-8");

        let mut empty = Response::default();
        messages::no_content(&mut empty);
        let out = into_http(empty, &Method::DELETE);
        assert_eq!(out.status(), StatusCode::NO_CONTENT);
        assert!(out.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_unauthorized_challenges() {
        let out = problem(&GatewayError::Unauthorized, &Method::GET);
        assert_eq!(out.status(), StatusCode::UNAUTHORIZED);
        assert!(out.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
