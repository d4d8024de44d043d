//! Instrumented outbound HTTP calls.
//!
//! Every call made through [`InstrumentedClient`] is timed, counted in the
//! metrics registry and written to an audit log with sensitive fields masked,
//! on the success path and the failure path alike.

pub mod config;
pub mod http;
pub mod instrument;
pub mod lifecycle;
pub mod observability;
pub mod transport;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use instrument::{CallSpec, InstrumentedClient, LogPolicy, TaggedClient};
pub use lifecycle::Shutdown;
pub use transport::{Transport, TransportError};
