//! Handler-side view of a routed request.

use axum::http::Method;
use serde_json::Value;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::response::AsyncResp;
use crate::routing::{EntityPrivileges, PathParams, PrivilegeSet};

/// Immutable request-scoped data handed to a resource.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub params: PathParams,
    /// Parsed JSON body, `Null` when the request had none.
    pub body: Value,
    pub username: Option<String>,
    pub privileges: PrivilegeSet,
}

/// One addressable resource template and its verb handlers.
///
/// Handlers never block: they write synchronously into the document and
/// issue bus calls through `resp`, then return. The response finalizes
/// once every issued call has settled.
pub trait Resource: Send + Sync + 'static {
    fn template(&self) -> &'static str;

    fn privileges(&self) -> EntityPrivileges {
        EntityPrivileges::standard().only(&[Method::GET, Method::HEAD])
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.fail(&GatewayError::VerbNotAllowed);
    }

    fn head(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        self.get(req, resp);
    }

    fn patch(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.fail(&GatewayError::VerbNotAllowed);
    }

    fn post(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.fail(&GatewayError::VerbNotAllowed);
    }

    fn put(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.fail(&GatewayError::VerbNotAllowed);
    }

    fn delete(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.fail(&GatewayError::VerbNotAllowed);
    }
}
