//! Caller-facing entry points.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::instrument::call::CallSpec;
use crate::instrument::describer::describe;
use crate::instrument::executor::{execute, CallResponse};
use crate::instrument::policy::LogPolicy;
use crate::instrument::reporter::OutcomeReporter;
use crate::observability::{LogSink, MetricsSink, RegistryMetrics, TracingSink};
use crate::transport::{ReqwestTransport, Transport, TransportError};

/// Performs instrumented calls: describe, execute, report, then return.
///
/// Cheap to clone; clones share the transport and sinks.
#[derive(Clone)]
pub struct InstrumentedClient {
    transport: Arc<dyn Transport>,
    reporter: OutcomeReporter,
}

impl InstrumentedClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        metrics: Arc<dyn MetricsSink>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            transport,
            reporter: OutcomeReporter::new(metrics, sink),
        }
    }

    /// Client backed by reqwest, the `metrics` registry and `tracing`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config)?;
        let client = Self::new(Arc::new(transport), Arc::new(RegistryMetrics), Arc::new(TracingSink));
        Ok(client.with_body_log_limit(config.response_log_limit))
    }

    pub fn with_body_log_limit(mut self, limit: usize) -> Self {
        self.reporter = self.reporter.with_body_log_limit(limit);
        self
    }

    /// Perform one call.
    ///
    /// The outcome is reported (one metric, one audit record) before this
    /// returns, on both paths. Transport failures are returned unchanged
    /// after reporting.
    pub async fn call(&self, spec: CallSpec, policy: LogPolicy) -> Result<CallResponse, TransportError> {
        let (request, view) = describe(&spec, &policy);
        let execution = execute(self.transport.as_ref(), &request).await;
        self.reporter.report(
            &request,
            &view,
            &execution.outcome,
            &policy,
            execution.dispatched_at,
        );
        execution.result
    }

    /// Wrap this client with a fixed caller identity.
    pub fn tagged(&self, caller_tag: impl Into<String>) -> TaggedClient {
        TaggedClient {
            inner: self.clone(),
            caller_tag: caller_tag.into(),
        }
    }
}

impl std::fmt::Debug for InstrumentedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedClient")
            .field("reporter", &self.reporter)
            .finish()
    }
}

/// An [`InstrumentedClient`] bound to one caller tag.
#[derive(Debug, Clone)]
pub struct TaggedClient {
    inner: InstrumentedClient,
    caller_tag: String,
}

impl TaggedClient {
    pub fn caller_tag(&self) -> &str {
        &self.caller_tag
    }

    /// Perform one call, logging it under this client's caller tag.
    /// Any tag already present in `policy` is replaced.
    pub async fn call(&self, spec: CallSpec, policy: LogPolicy) -> Result<CallResponse, TransportError> {
        let policy = policy.caller(self.caller_tag.clone());
        self.inner.call(spec, policy).await
    }
}
