//! Per-request execution context carrying the attached event sinks.

use super::event::PhaseEvent;
use super::sink::PhaseEventSink;
use std::fmt;
use std::time::{Duration, Instant};

type SinkRef<'a> = &'a mut (dyn PhaseEventSink + Send + 'a);

/// Everything a single request execution needs besides the request itself:
/// the sinks to report lifecycle events to, and an optional timeout override.
///
/// A context borrows its sinks mutably, so one tracker can only ever be
/// attached to one in-flight request.
#[derive(Default)]
pub struct ExecutionContext<'a> {
    sinks: Vec<SinkRef<'a>>,
    timeout: Option<Duration>,
}

impl<'a> ExecutionContext<'a> {
    /// An empty context: no sinks, client default timeout.
    pub fn background() -> Self {
        Self::default()
    }

    /// Overrides the client's per-stage timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns a context that additionally reports to `sink`. Sinks attached
    /// earlier still receive every event, before the new one does.
    pub fn with_sink<S>(mut self, sink: &'a mut S) -> Self
    where
        S: PhaseEventSink + Send + 'a,
    {
        self.sinks.push(sink);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn has_sinks(&self) -> bool {
        !self.sinks.is_empty()
    }

    /// Reports `event` as observed at `at` to every attached sink.
    pub fn emit_at(&mut self, event: PhaseEvent, at: Instant) {
        for sink in self.sinks.iter_mut() {
            sink.on_event(event, at);
        }
    }

    /// Reports `event` as observed now.
    pub fn emit(&mut self, event: PhaseEvent) {
        self.emit_at(event, Instant::now());
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("sinks", &self.sinks.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Registers `sink` on `context` for the lifetime of one request.
pub fn attach<'a, S>(context: ExecutionContext<'a>, sink: &'a mut S) -> ExecutionContext<'a>
where
    S: PhaseEventSink + Send + 'a,
{
    context.with_sink(sink)
}
