//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (request spans keyed by x-request-id)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured key=value fields on every event
//! - Request ID flows through all log lines of a request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod tracing;
