//! Request describer: splits a call into what is sent and what is logged.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::instrument::call::{CallSpec, Headers, HttpMethod};
use crate::instrument::mask::{mask_fields, mask_headers};
use crate::instrument::policy::LogPolicy;

/// The request as it goes over the wire. Never masked.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Value>,
    pub timeout: Duration,
    pub extra_options: Map<String, Value>,
}

impl NormalizedRequest {
    /// Label used for the `endpoint` metric dimension.
    pub fn endpoint(&self) -> &str {
        &self.url
    }
}

/// The request as it appears in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskedRequestView {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    /// `None` when the call has no body, serialized as `null`.
    pub body: Option<Value>,
}

/// Produce the outbound request and its redacted log view.
///
/// Pure: the same inputs always give equal outputs.
pub fn describe(spec: &CallSpec, policy: &LogPolicy) -> (NormalizedRequest, MaskedRequestView) {
    let request = NormalizedRequest {
        method: spec.method(),
        url: spec.target_url().to_string(),
        headers: spec.headers().clone(),
        body: spec.body().cloned(),
        timeout: spec.timeout(),
        extra_options: spec.extra_options().clone(),
    };

    let view = MaskedRequestView {
        method: request.method,
        url: request.url.clone(),
        headers: mask_headers(&request.headers, &policy.mask_request_headers),
        body: request
            .body
            .as_ref()
            .map(|body| mask_fields(body, &policy.mask_request_body)),
    };

    (request, view)
}
