//! Per-request timing state machine.
//!
//! A [`PhaseTracker`] accumulates timestamped [`PhaseEvent`]s for exactly one
//! request and derives the duration of each [`Phase`] as soon as the phase
//! closes. All mutation goes through [`PhaseTracker::apply`].

use super::event::{Boundary, Phase, PhaseEvent, TOTAL};
use super::report::TimingReport;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Start and end of one phase. `None` means the boundary event never fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseWindow {
    pub start: Option<Instant>,
    pub end: Option<Instant>,
}

/// Which instant the total duration is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TotalAnchor {
    /// Measure from DNS start. On a reused connection, or a literal IP host,
    /// DNS never starts and the total stays zero.
    #[default]
    DnsStart,
    /// Measure from the earliest acquisition instant recorded: DNS start,
    /// else connect start, else TLS start, else the moment the connection
    /// was obtained.
    ConnectionAcquired,
}

/// An event sequence that breaks the start-before-done or fire-once rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceAnomaly {
    /// A phase closed without having been opened; its duration stays zero.
    DoneWithoutStart(Phase),
    /// A phase closed at an instant earlier than it opened; its duration stays zero.
    EndBeforeStart(Phase),
    /// The named event fired more than once; later occurrences are ignored.
    Repeated(&'static str),
}

/// The five derived durations. Zero until the matching phase closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseDurations {
    pub dns_lookup: Duration,
    pub connect: Duration,
    pub tls_handshake: Duration,
    pub server_processing: Duration,
    pub total: Duration,
}

impl PhaseDurations {
    pub fn get(&self, phase: Phase) -> Duration {
        match phase {
            Phase::DnsLookup => self.dns_lookup,
            Phase::Connect => self.connect,
            Phase::TlsHandshake => self.tls_handshake,
            Phase::ServerProcessing => self.server_processing,
        }
    }

    fn slot_mut(&mut self, phase: Phase) -> &mut Duration {
        match phase {
            Phase::DnsLookup => &mut self.dns_lookup,
            Phase::Connect => &mut self.connect,
            Phase::TlsHandshake => &mut self.tls_handshake,
            Phase::ServerProcessing => &mut self.server_processing,
        }
    }

    /// Durations keyed by phase name, plus `"Total"`.
    pub fn to_map(&self) -> BTreeMap<&'static str, Duration> {
        let mut map: BTreeMap<_, _> = Phase::ALL
            .iter()
            .map(|&phase| (phase.name(), self.get(phase)))
            .collect();
        map.insert(TOTAL, self.total);
        map
    }
}

/// Timing state for a single request.
///
/// Preconditions on the event source: every `*Start` precedes its `*Done`,
/// and each event fires at most once. Violations never panic; they leave the
/// affected duration at zero and are recorded in [`anomalies`](Self::anomalies).
///
/// A zero duration on its own does not mean the phase was instant. Check
/// [`connection_reused`](Self::connection_reused) and
/// [`uses_tls`](Self::uses_tls) to tell a skipped phase from a fast one.
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    connection_reused: bool,
    uses_tls: bool,
    connection_obtained: Option<Instant>,
    windows: [PhaseWindow; 4],
    durations: PhaseDurations,
    anomalies: Vec<SequenceAnomaly>,
    anchor: TotalAnchor,
    seen: u16,
}

impl PhaseTracker {
    /// Creates a zero-initialized tracker anchoring the total at DNS start.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anchor(anchor: TotalAnchor) -> Self {
        Self {
            anchor,
            ..Self::default()
        }
    }

    /// Applies one lifecycle event observed at `at`.
    pub fn apply(&mut self, event: PhaseEvent, at: Instant) {
        if self.seen & event.bit() != 0 {
            self.flag(SequenceAnomaly::Repeated(event.kind()));
            return;
        }
        self.seen |= event.bit();
        tracing::trace!(event = event.kind(), "phase event");

        match event {
            PhaseEvent::GotConn { reused } => {
                self.connection_reused = reused;
                self.connection_obtained = Some(at);
            }
            PhaseEvent::TlsHandshakeStart => self.uses_tls = true,
            _ => {}
        }

        match event.boundary() {
            Some(Boundary::Start(phase)) => self.windows[phase as usize].start = Some(at),
            Some(Boundary::End(phase)) => self.close(phase, at),
            None => {}
        }

        if event == PhaseEvent::GotFirstResponseByte {
            self.derive_total(at);
        }
    }

    fn close(&mut self, phase: Phase, at: Instant) {
        let window = &mut self.windows[phase as usize];
        window.end = Some(at);

        let Some(start) = window.start else {
            self.flag(SequenceAnomaly::DoneWithoutStart(phase));
            return;
        };

        match at.checked_duration_since(start) {
            Some(elapsed) => {
                *self.durations.slot_mut(phase) = elapsed;
                tracing::debug!(phase = phase.name(), ?elapsed, "phase closed");
            }
            None => self.flag(SequenceAnomaly::EndBeforeStart(phase)),
        }
    }

    fn derive_total(&mut self, at: Instant) {
        let dns_start = self.windows[Phase::DnsLookup as usize].start;
        let anchor = match self.anchor {
            TotalAnchor::DnsStart => dns_start,
            TotalAnchor::ConnectionAcquired => dns_start
                .or(self.windows[Phase::Connect as usize].start)
                .or(self.windows[Phase::TlsHandshake as usize].start)
                .or(self.connection_obtained),
        };

        match anchor.and_then(|anchor| at.checked_duration_since(anchor)) {
            Some(total) => {
                self.durations.total = total;
                tracing::debug!(?total, "request complete");
            }
            None => tracing::debug!(
                anchor = ?self.anchor,
                reused = self.connection_reused,
                "no anchor recorded, total left at zero"
            ),
        }
    }

    fn flag(&mut self, anomaly: SequenceAnomaly) {
        tracing::warn!(?anomaly, "malformed phase event sequence");
        self.anomalies.push(anomaly);
    }

    /// Durations keyed by `DNSLookup`, `Connect`, `TLSHandshake`,
    /// `ServerProcessing` and `Total`. Callable at any time; fields not yet
    /// derived read as zero.
    pub fn durations(&self) -> BTreeMap<&'static str, Duration> {
        self.durations.to_map()
    }

    pub fn phase_durations(&self) -> PhaseDurations {
        self.durations
    }

    pub fn duration(&self, phase: Phase) -> Duration {
        self.durations.get(phase)
    }

    pub fn total(&self) -> Duration {
        self.durations.total
    }

    /// Whether the connection was taken from the idle pool.
    pub fn connection_reused(&self) -> bool {
        self.connection_reused
    }

    /// Whether a TLS handshake started for this request.
    pub fn uses_tls(&self) -> bool {
        self.uses_tls
    }

    pub fn window(&self, phase: Phase) -> PhaseWindow {
        self.windows[phase as usize]
    }

    pub fn connection_obtained_at(&self) -> Option<Instant> {
        self.connection_obtained
    }

    pub fn anchor(&self) -> TotalAnchor {
        self.anchor
    }

    pub fn anomalies(&self) -> &[SequenceAnomaly] {
        &self.anomalies
    }

    /// True once the first response byte has been recorded.
    pub fn is_complete(&self) -> bool {
        self.seen & PhaseEvent::GotFirstResponseByte.bit() != 0
    }

    pub fn report(&self) -> TimingReport {
        TimingReport::from_tracker(self)
    }
}
