//! Instrumented call subsystem.
//!
//! # Data Flow
//! ```text
//! CallSpec + LogPolicy
//!     → describer.rs (NormalizedRequest for the wire, MaskedRequestView for logs)
//!     → executor.rs  (one transport call, timed from dispatch to resolution)
//!     → reporter.rs  (one metric observation + one audit record)
//!     → caller gets the response, or the original transport error
//! ```
//!
//! # Design Decisions
//! - Malformed specs are rejected at construction, before any I/O
//! - Masking works on copies; the outbound request is never altered
//! - Success and failure share one timing path
//! - Reporting always happens before the error propagates

pub mod call;
pub mod client;
pub mod describer;
pub mod executor;
pub mod mask;
pub mod policy;
pub mod reporter;

pub use call::{CallSpec, CallSpecBuilder, ConstructionError, Headers, HttpMethod, RequestConfig};
pub use client::{InstrumentedClient, TaggedClient};
pub use describer::{describe, MaskedRequestView, NormalizedRequest};
pub use executor::{execute, CallResponse, Execution, Outcome, ResponseBody};
pub use mask::REDACTION_MARKER;
pub use policy::LogPolicy;
pub use reporter::{LogRecord, OutcomeReporter, RESPONSE_BODY_LOG_LIMIT};
