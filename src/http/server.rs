//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: a single fallback handler feeding the gateway
//! - Wire up middleware (request id, tracing, timeout, body limit)
//! - Authenticate callers against the live account table
//! - Serve until the shutdown broadcast fires

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::http::{auth, request, response};
use crate::observability::tracing::request_span;
use crate::security::AccountStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub accounts: Arc<ArcSwap<AccountStore>>,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    pub fn new(config: GatewayConfig, gateway: Gateway, accounts: Arc<ArcSwap<AccountStore>>) -> Self {
        let state = AppState { gateway, accounts };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router alone, for driving requests without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                if shutdown.recv().await.is_err() {
                    tracing::debug!("Shutdown channel closed");
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Every path goes to the gateway; routing happens there.
async fn gateway_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (parts, body) = req.into_parts();

    let caller = match auth::authenticate(&state.accounts.load(), &parts.headers) {
        Ok(caller) => caller,
        Err(e) => return response::problem(&e, &parts.method),
    };

    let body = match request::read_body(body).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let method = parts.method.clone();
    let res = state
        .gateway
        .handle(request::gateway_request(&parts, body, caller))
        .await;
    response::into_http(res, &method)
}
