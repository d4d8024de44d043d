//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): outbound calls by method, endpoint, status
//! - `http_request_latency_seconds` (histogram): outbound call latency
//!
//! `status` is the numeric response code, or `"error"` when no response was
//! received.

use std::sync::{Mutex, OnceLock, PoisonError};

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_LATENCY: &str = "http_request_latency_seconds";

/// Status label used when the call produced no response.
pub const ERROR_STATUS: &str = "error";

/// Latency buckets in seconds, tuned for typical upstream API calls.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// One observation derived from a call outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvent {
    pub method: String,
    pub endpoint: String,
    pub status: String,
    pub duration_secs: f64,
}

/// Destination for metric events. Implementations must be safe to call
/// from concurrent invocations.
pub trait MetricsSink: Send + Sync {
    fn observe(&self, event: &MetricEvent);
}

/// Writes through the process-wide `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryMetrics;

impl MetricsSink for RegistryMetrics {
    fn observe(&self, event: &MetricEvent) {
        counter!(
            REQUESTS_TOTAL,
            "method" => event.method.clone(),
            "endpoint" => event.endpoint.clone(),
            "status" => event.status.clone()
        )
        .increment(1);

        histogram!(
            REQUEST_LATENCY,
            "method" => event.method.clone(),
            "endpoint" => event.endpoint.clone(),
            "status" => event.status.clone()
        )
        .record(event.duration_secs);
    }
}

fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_LATENCY.to_string()), LATENCY_BUCKETS)
}

/// Install the Prometheus recorder once per process and return its handle.
///
/// Concurrent first calls are serialized; all of them get the same handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let _guard = INSTALL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = prometheus_builder()?.install_recorder()?;

    describe_counter!(REQUESTS_TOTAL, "Total outbound HTTP requests");
    describe_histogram!(REQUEST_LATENCY, Unit::Seconds, "Outbound HTTP request latency");

    tracing::info!("Prometheus recorder installed");
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}
