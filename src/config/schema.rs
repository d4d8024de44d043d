//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every section has defaults so a minimal (or empty) file is valid.

use serde::{Deserialize, Serialize};

use crate::instrument::reporter::RESPONSE_BODY_LOG_LIMIT;
use crate::instrument::LogPolicy;

/// Root configuration for the relay service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Inbound listener.
    pub listener: ListenerConfig,

    /// Outbound client settings.
    pub client: ClientConfig,

    /// Upstream the relay forwards to, and how those calls are logged.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Inbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Timeout applied to relayed calls, in seconds.
    pub call_timeout_secs: u64,

    /// User-Agent sent on outbound calls.
    pub user_agent: String,

    /// Characters of a non-object response body kept in audit records.
    pub response_log_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            call_timeout_secs: 10,
            user_agent: concat!("instrumented-http/", env!("CARGO_PKG_VERSION")).to_string(),
            response_log_limit: RESPONSE_BODY_LOG_LIMIT,
        }
    }
}

/// Upstream target of the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Collection URL; item calls append `/{id}`.
    pub cards_url: String,

    /// Caller tag attached to every relayed call.
    pub caller_log_code: String,

    /// Request headers masked in audit records.
    pub mask_headers_request: Vec<String>,

    /// Request body fields masked in audit records.
    pub mask_body_request: Vec<String>,

    /// Response body fields masked in audit records.
    pub mask_body_response: Vec<String>,
}

impl UpstreamConfig {
    pub fn log_policy(&self) -> LogPolicy {
        LogPolicy::new()
            .caller(self.caller_log_code.clone())
            .mask_request_headers(self.mask_headers_request.iter().cloned())
            .mask_request_body(self.mask_body_request.iter().cloned())
            .mask_response_body(self.mask_body_response.iter().cloned())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            cards_url: "http://127.0.0.1:3000/cards".to_string(),
            caller_log_code: "MAIN_test_post".to_string(),
            mask_headers_request: vec!["authorization".to_string()],
            mask_body_request: vec!["description".to_string()],
            mask_body_response: vec!["numero".to_string(), "description".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    pub metrics_enabled: bool,

    /// Extra listener serving only `/metrics` (e.g., "0.0.0.0:8000").
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: None,
        }
    }
}
