//! Reference execution layer.
//!
//! Issues HTTP/1.1 requests over tokio, rustls and hyper, and reports DNS,
//! connect, TLS, write and first-byte events to the sinks attached to the
//! request's [`ExecutionContext`](crate::track::ExecutionContext).

pub mod executor;
mod io;
mod pool;
pub mod target;
pub mod types;

pub use executor::TracingClient;
pub use target::Origin;
pub use types::{version_to_string, TracedRequest, TracedResponse};
