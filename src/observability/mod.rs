//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Outcome reporter produces, per call:
//!     → metrics.rs (one counter increment + one histogram sample)
//!     → logging.rs (one pre-formatted audit record via LogSink)
//!
//! Consumers:
//!     → Metrics endpoint (Prometheus scrape of the relay's /metrics)
//!     → tracing subscriber installed by the binary (stdout)
//! ```
//!
//! # Design Decisions
//! - Sinks are explicit handles passed at construction, never globals
//! - Metric updates go through the `metrics` facade (atomic, lock-free)
//! - The recorder and subscriber are installed only by binaries

pub mod logging;
pub mod metrics;

pub use logging::{LogSink, Severity, TracingSink};
pub use self::metrics::{MetricEvent, MetricsSink, RegistryMetrics};
