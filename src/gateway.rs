//! Request entry point shared by the HTTP transport and the tests.
//!
//! # Data Flow
//! ```text
//! GatewayRequest (method, path, body bytes, caller)
//!     → Router::resolve
//!     → NotFound / MethodNotAllowed / Forbidden: problem document, no bus traffic
//!     → Resolved: parse body, AsyncResp::new, Resource::<verb>
//!     → drop handler guard, await Completion
//!     → finished Response
//! ```

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::bus::Bus;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::response::{messages, AsyncResp, Response};
use crate::routing::{PrivilegeSet, RequestContext, Resolution, Resource, RouteError, Router};

/// One request as the gateway sees it, after authentication.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub body: Bytes,
    pub username: Option<String>,
    pub privileges: PrivilegeSet,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Bytes::new(),
            username: None,
            privileges: PrivilegeSet::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn as_user(mut self, username: impl Into<String>, privileges: PrivilegeSet) -> Self {
        self.username = Some(username.into());
        self.privileges = privileges;
        self
    }
}

/// Frozen resource tree plus the bus every handler talks to.
#[derive(Clone)]
pub struct Gateway {
    router: Arc<Router>,
    bus: Arc<dyn Bus>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").field("router", &self.router).finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(router: Router, bus: Arc<dyn Bus>) -> Self {
        Self {
            router: Arc::new(router),
            bus,
        }
    }

    /// Gateway over the full Redfish resource tree.
    pub fn with_all_resources(bus: Arc<dyn Bus>) -> Result<Self, RouteError> {
        let mut router = Router::new();
        crate::resources::register_all(&mut router)?;
        Ok(Self::new(router, bus))
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn handle(&self, req: GatewayRequest) -> Response {
        let start = Instant::now();
        let (route, response) = match self.router.resolve(&req.method, &req.path, &req.privileges) {
            Resolution::Resolved { resource, params } => {
                let route = resource.template();
                let body = match parse_body(&req.body) {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::debug!(path = %req.path, error = %e, "Rejecting request body");
                        return finish(&req, route, problem(&e), start);
                    }
                };
                let ctx = RequestContext {
                    method: req.method.clone(),
                    path: req.path.clone(),
                    params,
                    body,
                    username: req.username.clone(),
                    privileges: req.privileges.clone(),
                };
                (route, self.dispatch(resource, ctx).await)
            }
            Resolution::NotFound => ("none", problem(&GatewayError::PathNotFound(req.path.clone()))),
            Resolution::Forbidden => ("none", problem(&GatewayError::PrivilegeDenied)),
            Resolution::MethodNotAllowed { allowed } => {
                let mut res = problem(&GatewayError::VerbNotAllowed);
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    res.headers.insert(header::ALLOW, value);
                }
                ("none", res)
            }
        };
        finish(&req, route, response, start)
    }

    async fn dispatch(&self, resource: Arc<dyn Resource>, ctx: RequestContext) -> Response {
        let (guard, completion) = AsyncResp::new(Arc::clone(&self.bus), Response::default());
        match ctx.method {
            Method::GET => resource.get(&ctx, &guard),
            Method::HEAD => resource.head(&ctx, &guard),
            Method::PATCH => resource.patch(&ctx, &guard),
            Method::POST => resource.post(&ctx, &guard),
            Method::PUT => resource.put(&ctx, &guard),
            Method::DELETE => resource.delete(&ctx, &guard),
            _ => guard.fail(&GatewayError::VerbNotAllowed),
        }
        drop(guard);
        completion.wait().await
    }
}

fn problem(err: &GatewayError) -> Response {
    let mut res = Response::default();
    messages::record(&mut res, err);
    res
}

/// Empty bodies read as `Null`; anything else must be JSON.
fn parse_body(body: &[u8]) -> Result<Value, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::MalformedBody(e.to_string()))
}

fn finish(req: &GatewayRequest, route: &str, res: Response, start: Instant) -> Response {
    tracing::info!(
        method = %req.method,
        path = %req.path,
        user = req.username.as_deref().unwrap_or("anonymous"),
        status = res.status.as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request handled"
    );
    metrics::record_request(req.method.as_str(), res.status.as_u16(), route, start);
    res
}
