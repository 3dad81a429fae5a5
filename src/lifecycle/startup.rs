//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the bus (fixture or demo tree, latency, per-call deadline)
//! - Register the resource tree
//! - Load accounts and start the config watcher
//! - Start metrics, then bind the listener and serve
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when ready)

use arc_swap::ArcSwap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::bus::memory::FixtureError;
use crate::bus::seed::{demo_store, standard_bus};
use crate::bus::{Bus, ObjectStore, TimeoutBus};
use crate::config::{ConfigError, ConfigWatcher, GatewayConfig};
use crate::gateway::Gateway;
use crate::http::HttpServer;
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::RouteError;
use crate::security::AccountStore;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),

    #[error("Route registration failed: {0}")]
    Routes(#[from] RouteError),

    #[error("Config watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bus described by `config`, with the per-call deadline applied.
pub fn build_bus(config: &GatewayConfig) -> Result<Arc<dyn Bus>, StartupError> {
    let store = match &config.bus.fixture_path {
        Some(path) => {
            tracing::info!(path = ?path, "Loading bus fixture");
            ObjectStore::load(path)?
        }
        None => demo_store(),
    };
    let memory = standard_bus(store).with_latency(
        Duration::from_millis(config.bus.latency_ms),
        Duration::from_millis(config.bus.jitter_ms),
    );
    let deadline = Duration::from_millis(config.timeouts.bus_call_ms);
    Ok(Arc::new(TimeoutBus::new(memory, deadline)))
}

/// Apply every configuration the watcher delivers to the account table.
fn spawn_account_reloader(
    accounts: Arc<ArcSwap<AccountStore>>,
    mut updates: tokio::sync::mpsc::UnboundedReceiver<GatewayConfig>,
) {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            let store = AccountStore::from_config(&config.accounts);
            tracing::info!(accounts = store.len(), "Account table reloaded");
            accounts.store(Arc::new(store));
        }
    });
}

/// Run the gateway until a shutdown signal arrives.
pub async fn run(config: GatewayConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    let bus = build_bus(&config)?;
    let gateway = Gateway::with_all_resources(bus)?;
    tracing::info!(routes = gateway.router().len(), "Resource tree registered");

    let accounts = Arc::new(ArcSwap::from_pointee(AccountStore::from_config(&config.accounts)));
    if accounts.load().is_empty() {
        tracing::warn!("No accounts configured; only anonymous resources are reachable");
    }

    let _watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            spawn_account_reloader(Arc::clone(&accounts), updates);
            Some(watcher.run()?)
        }
        None => None,
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    HttpServer::new(config, gateway, accounts)
        .run(listener, server_shutdown)
        .await?;
    Ok(())
}
