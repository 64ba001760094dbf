//! Serializable snapshot of a tracker's results.

use super::event::Phase;
use super::tracker::PhaseTracker;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Phase durations in fractional milliseconds, with the flags needed to
/// interpret zero values.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimingReport {
    pub dns_lookup: f64,
    pub connect: f64,
    pub tls_handshake: f64,
    pub server_processing: f64,
    pub total: f64,
    pub connection_reused: bool,
    pub uses_tls: bool,
    /// Setup phases that never started: reused connection, IP literal host,
    /// plain HTTP, or a failure before the phase was reached.
    pub skipped_phases: Vec<&'static str>,
    #[serde(skip_serializing_if = "is_zero")]
    pub anomalies: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

impl TimingReport {
    pub fn from_tracker(tracker: &PhaseTracker) -> Self {
        let durations = tracker.phase_durations();
        Self {
            dns_lookup: millis(durations.dns_lookup),
            connect: millis(durations.connect),
            tls_handshake: millis(durations.tls_handshake),
            server_processing: millis(durations.server_processing),
            total: millis(durations.total),
            connection_reused: tracker.connection_reused(),
            uses_tls: tracker.uses_tls(),
            skipped_phases: [Phase::DnsLookup, Phase::Connect, Phase::TlsHandshake]
                .into_iter()
                .filter(|&phase| tracker.window(phase).start.is_none())
                .map(Phase::name)
                .collect(),
            anomalies: tracker.anomalies().len(),
        }
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let skipped = |phase: Phase| {
            if self.skipped_phases.contains(&phase.name()) {
                " (skipped)"
            } else {
                ""
            }
        };

        writeln!(f, "Time breakdown:")?;
        writeln!(
            f,
            "  DNS lookup:        {:>10.3} ms{}",
            self.dns_lookup,
            skipped(Phase::DnsLookup)
        )?;
        writeln!(
            f,
            "  TCP connect:       {:>10.3} ms{}",
            self.connect,
            skipped(Phase::Connect)
        )?;
        writeln!(
            f,
            "  TLS handshake:     {:>10.3} ms{}",
            self.tls_handshake,
            skipped(Phase::TlsHandshake)
        )?;
        writeln!(f, "  Server processing: {:>10.3} ms", self.server_processing)?;
        writeln!(f, "  Total:             {:>10.3} ms", self.total)?;
        if self.anomalies > 0 {
            writeln!(f, "  ({} malformed event(s) ignored)", self.anomalies)?;
        }
        Ok(())
    }
}
