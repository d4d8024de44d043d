//! Relay HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum routing, header stripping, body checks)
//!     → instrument::TaggedClient (describe → execute → report)
//!     → upstream status + body wrapped as {"status", "response"}
//! ```

pub mod server;

pub use server::HttpServer;
