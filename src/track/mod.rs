//! Request lifecycle tracking.
//!
//! A [`PhaseTracker`] is created fresh for each request, attached to that
//! request's [`ExecutionContext`], and read once the response body has been
//! drained:
//!
//! ```no_run
//! # async fn run() -> Result<(), http_track::TraceError> {
//! use http_track::{attach, ExecutionContext, PhaseTracker, TracedRequest, TracingClient};
//!
//! let client = TracingClient::new();
//! let mut tracker = PhaseTracker::new();
//! let ctx = attach(ExecutionContext::background(), &mut tracker);
//! client.execute(TracedRequest::get("https://example.com"), ctx).await?;
//! println!("{:?}", tracker.durations());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod event;
pub mod report;
pub mod sink;
pub mod tracker;

pub use context::{attach, ExecutionContext};
pub use event::{Phase, PhaseEvent, TOTAL};
pub use report::TimingReport;
pub use sink::PhaseEventSink;
pub use tracker::{PhaseDurations, PhaseTracker, PhaseWindow, SequenceAnomaly, TotalAnchor};
