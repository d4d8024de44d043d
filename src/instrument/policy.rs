//! Logging policy: who is calling and what must never reach the logs.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Immutable description of how one call is logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogPolicy {
    /// Free-form identifier of the logical caller, for cross-service correlation.
    #[serde(alias = "caller_log_code")]
    pub caller_tag: Option<String>,

    /// Request header names to redact (matched case-insensitively).
    #[serde(alias = "mask_headers_request", alias = "mask_headers")]
    pub mask_request_headers: Vec<String>,

    /// Top-level request body fields to redact.
    #[serde(alias = "mask_body_request")]
    pub mask_request_body: Vec<String>,

    /// Top-level response body fields to redact.
    #[serde(alias = "mask_body_response")]
    pub mask_response_body: Vec<String>,
}

impl LogPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caller(mut self, tag: impl Into<String>) -> Self {
        self.caller_tag = Some(tag.into());
        self
    }

    pub fn mask_request_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mask_request_headers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn mask_request_body<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mask_request_body = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn mask_response_body<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mask_response_body = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a policy document whose top-level keys may use any casing
    /// (`CALLER_LOG_CODE`, `Mask_Body_Request`, ...). Unknown keys are ignored.
    pub fn from_document(document: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let lowered: Map<String, Value> = document
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        serde_json::from_value(Value::Object(lowered))
    }
}
