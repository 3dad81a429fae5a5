//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` wins when set; otherwise the configured level applies to
//!   this crate and `tower_http`
//! - Installing twice is harmless (tests share one process)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_directives(level: &str) -> String {
    format!("bmc_gateway={level},gateway_cli={level},tower_http={level}")
}

/// Install the global subscriber.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
