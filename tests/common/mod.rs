//! Shared utilities for integration tests.

#![allow(dead_code)]

use arc_swap::ArcSwap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use bmc_gateway::bus::seed::{demo_store, standard_bus};
use bmc_gateway::bus::{Bus, MemoryBus};
use bmc_gateway::config::{AccountConfig, GatewayConfig};
use bmc_gateway::response::Response;
use bmc_gateway::routing::PrivilegeSet;
use bmc_gateway::security::{AccountStore, Role};
use bmc_gateway::{Gateway, GatewayRequest, HttpServer, Shutdown};

pub const ADMIN: (&str, &str) = ("root", "0penBmc");
pub const OPERATOR: (&str, &str) = ("operator", "op-pass");
pub const READER: (&str, &str) = ("viewer", "view-pass");

/// Demo bus plus a gateway over it; the bus stays reachable for inspection.
pub struct Harness {
    pub bus: Arc<MemoryBus>,
    pub gateway: Gateway,
}

pub fn harness() -> Harness {
    let bus = Arc::new(standard_bus(demo_store()));
    let dyn_bus: Arc<dyn Bus> = bus.clone();
    let gateway = Gateway::with_all_resources(dyn_bus).expect("resource tree registers");
    Harness { bus, gateway }
}

pub fn role(role: Role) -> PrivilegeSet {
    role.privileges()
}

impl Harness {
    pub async fn send(&self, method: &str, path: &str, body: Option<Value>, role: Role) -> Response {
        let method = method.parse().expect("valid method");
        let mut req = GatewayRequest::new(method, path).as_user("tester", role.privileges());
        if let Some(body) = body {
            req = req.with_body(body.to_string());
        }
        tokio::time::timeout(Duration::from_secs(5), self.gateway.handle(req))
            .await
            .expect("request never completed")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.send("GET", path, None, Role::ReadOnly).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Response {
        self.send("PATCH", path, Some(body), Role::Administrator).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.send("POST", path, Some(body), Role::Administrator).await
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.send("DELETE", path, None, Role::Administrator).await
    }
}

/// Message ids recorded in a document, without the registry prefix.
pub fn message_ids(res: &Response) -> Vec<String> {
    res.json["error"]["@Message.ExtendedInfo"]
        .as_array()
        .map(|infos| {
            infos
                .iter()
                .filter_map(|info| info["MessageId"].as_str())
                .map(|id| id.rsplit('.').next().unwrap_or(id).to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn test_accounts() -> Vec<AccountConfig> {
    [(ADMIN, Role::Administrator), (OPERATOR, Role::Operator), (READER, Role::ReadOnly)]
        .into_iter()
        .map(|((username, password), role)| AccountConfig {
            username: username.into(),
            password: password.into(),
            role,
        })
        .collect()
}

pub fn basic_auth((user, password): (&str, &str)) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

/// Full HTTP server on an ephemeral port.
pub async fn start_server(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accounts = Arc::new(ArcSwap::from_pointee(AccountStore::from_config(&config.accounts)));
    let gateway = harness().gateway;
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, gateway, accounts);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
