//! Per-request HTTP latency breakdown.
//!
//! The core is [`PhaseTracker`], a state machine that turns timestamped
//! lifecycle events into DNS, connect, TLS handshake, server processing and
//! total durations. [`TracingClient`] is a small execution layer that
//! reports those events for real requests.

pub mod client;
pub mod config;
pub mod error;
pub mod infra;
pub mod track;

pub use client::{TracedRequest, TracedResponse, TracingClient};
pub use config::Config;
pub use error::TraceError;
pub use track::{
    attach, ExecutionContext, Phase, PhaseEvent, PhaseEventSink, PhaseTracker, TimingReport,
    TotalAnchor,
};
