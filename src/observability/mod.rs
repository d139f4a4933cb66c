//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated secrets
//! - Metric updates are no-ops until a recorder is installed
//! - Subscriber and exporter are installed once, by the composition root

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
