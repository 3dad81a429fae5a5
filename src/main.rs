//! BMC management gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http (axum + tower-http layers, Basic auth)
//!                       │
//!                       ▼
//!                     gateway ──▶ routing (template match, privileges)
//!                       │
//!                       ▼
//!                     resources (Redfish handlers)
//!                       │  issue BusCall ×N
//!                       ▼
//!                     response::AsyncResp ◀──── bus (TimeoutBus → MemoryBus)
//!                       │  last completion
//!                       ▼
//!     Client Response ◀─ http (JSON document)
//! ```

use clap::Parser;
use std::path::PathBuf;

use bmc_gateway::config::{load_config, GatewayConfig};
use bmc_gateway::observability::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "bmc-gateway", version, about = "Redfish gateway for a BMC object bus")]
struct Args {
    /// TOML configuration file; watched for account changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        bus_call_ms = config.timeouts.bus_call_ms,
        "bmc-gateway starting"
    );

    bmc_gateway::lifecycle::run(config, args.config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
