//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber for the binaries
//! - Provide the audit log sink handed to the outcome reporter
//!
//! The library never installs a global subscriber itself; that belongs to
//! the process entry point.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target under which audit records are emitted.
pub const AUDIT_TARGET: &str = "instrumented_http::audit";

/// Severity of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Destination for pre-formatted audit records.
pub trait LogSink: Send + Sync {
    fn write(&self, severity: Severity, record: &str);
}

/// Forwards audit records to the active `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, severity: Severity, record: &str) {
        match severity {
            Severity::Info => tracing::info!(target: AUDIT_TARGET, "{}", record),
            Severity::Error => tracing::error!(target: AUDIT_TARGET, "{}", record),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "instrumented_http={lvl},traffic_gen={lvl},tower_http={lvl}",
            lvl = default_level
        )
        .into()
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
