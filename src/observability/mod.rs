//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the dispatcher span
//! - Metrics are cheap (atomic increments)
//! - The metrics exporter is optional and off by default

pub mod logging;
pub mod metrics;
