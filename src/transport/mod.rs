//! Outbound transport subsystem.
//!
//! # Data Flow
//! ```text
//! NormalizedRequest
//!     → Transport::perform_call (one network round trip, timeout enforced here)
//!     → RawResponse | TransportError
//!     → executor (timing, body decoding)
//! ```
//!
//! # Design Decisions
//! - The transport is opaque to the core: no retries, no pooling policy
//! - Non-2xx statuses are responses, not errors
//! - Extra options are forwarded verbatim; each transport decides what it honours

pub mod http_client;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::instrument::call::Headers;
use crate::instrument::describer::NormalizedRequest;

pub use http_client::ReqwestTransport;

/// Failure of one outbound call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("connection failed: {message}")]
    Connect { message: String },

    #[error("request failed: {message}")]
    Request { message: String },

    #[error("malformed response body: {message}")]
    MalformedBody { message: String },
}

/// A response as the transport received it, body fully buffered.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status_code: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

/// The network collaborator of the executor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform exactly one call. Timeouts surface as [`TransportError::Timeout`].
    async fn perform_call(&self, request: &NormalizedRequest) -> Result<RawResponse, TransportError>;
}
