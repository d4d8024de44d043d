//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::instrument::call::{Headers, HttpMethod};
use crate::instrument::describer::NormalizedRequest;
use crate::transport::{RawResponse, Transport, TransportError};

/// Extra option holding query parameters (a JSON object).
pub const OPTION_QUERY: &str = "query";

/// Transport performing calls with a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Request {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Options => Method::OPTIONS,
    }
}

fn query_pairs(value: &Value) -> Vec<(String, String)> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect()
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout { timeout }
    } else if error.is_connect() {
        TransportError::Connect {
            message: error.to_string(),
        }
    } else {
        TransportError::Request {
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform_call(&self, request: &NormalizedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url)
            .timeout(request.timeout);

        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        for (key, value) in &request.extra_options {
            match key.as_str() {
                OPTION_QUERY => builder = builder.query(&query_pairs(value)),
                other => tracing::debug!(option = %other, "Ignoring unsupported transport option"),
            }
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, request.timeout))?;

        let status_code = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(v) => headers.append(name.as_str(), v),
                Err(_) => tracing::debug!(header = %name, "Skipping non UTF-8 response header"),
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, request.timeout))?;

        Ok(RawResponse {
            status_code,
            headers,
            body,
        })
    }
}
