//! Configuration validation.
//!
//! Semantic checks only; serde already handled syntax. All errors are
//! collected, not just the first.

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("upstream.cards_url '{url}' is invalid: {reason}")]
    UpstreamUrl { url: String, reason: String },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("listener.request_timeout_secs"));
    }
    if config.client.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("client.connect_timeout_secs"));
    }
    if config.client.call_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("client.call_timeout_secs"));
    }
    if config.client.response_log_limit == 0 {
        errors.push(ValidationError::ZeroValue("client.response_log_limit"));
    }
    if let Err(e) = url::Url::parse(&config.upstream.cards_url) {
        errors.push(ValidationError::UpstreamUrl {
            url: config.upstream.cards_url.clone(),
            reason: e.to_string(),
        });
    }
    if let Some(address) = &config.observability.metrics_address {
        if address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::MetricsAddress(address.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
