//! Lifecycle events and the phases they delimit.

use std::fmt;

/// A measured sub-interval of a request's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    DnsLookup,
    Connect,
    TlsHandshake,
    ServerProcessing,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::DnsLookup,
        Phase::Connect,
        Phase::TlsHandshake,
        Phase::ServerProcessing,
    ];

    /// Key used for this phase in [`PhaseTracker::durations`](super::PhaseTracker::durations).
    pub fn name(self) -> &'static str {
        match self {
            Phase::DnsLookup => "DNSLookup",
            Phase::Connect => "Connect",
            Phase::TlsHandshake => "TLSHandshake",
            Phase::ServerProcessing => "ServerProcessing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key used for the end-to-end duration in the durations map.
pub const TOTAL: &str = "Total";

/// A lifecycle event reported by the request-execution layer.
///
/// Events for one request are expected in the order they are declared here,
/// with every `*Start` preceding its `*Done`. Not every event fires on every
/// request: a reused connection skips DNS, connect and TLS entirely, a
/// literal IP host skips DNS, and a plain-text connection skips TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A connection was handed to the request, either pooled or freshly dialed.
    GotConn { reused: bool },
    DnsStart,
    DnsDone,
    ConnectStart,
    /// Fires whether or not the dial succeeded.
    ConnectDone,
    TlsHandshakeStart,
    /// Fires whether or not the handshake succeeded.
    TlsHandshakeDone,
    /// The request head and body have been flushed to the transport.
    WroteRequest,
    GotFirstResponseByte,
}

/// Where an event sits relative to the phase it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundary {
    Start(Phase),
    End(Phase),
}

impl PhaseEvent {
    /// Stable identifier, independent of any payload the event carries.
    pub fn kind(self) -> &'static str {
        match self {
            PhaseEvent::GotConn { .. } => "GotConn",
            PhaseEvent::DnsStart => "DNSStart",
            PhaseEvent::DnsDone => "DNSDone",
            PhaseEvent::ConnectStart => "ConnectStart",
            PhaseEvent::ConnectDone => "ConnectDone",
            PhaseEvent::TlsHandshakeStart => "TLSHandshakeStart",
            PhaseEvent::TlsHandshakeDone => "TLSHandshakeDone",
            PhaseEvent::WroteRequest => "WroteRequest",
            PhaseEvent::GotFirstResponseByte => "GotFirstResponseByte",
        }
    }

    pub(crate) fn boundary(self) -> Option<Boundary> {
        match self {
            PhaseEvent::GotConn { .. } => None,
            PhaseEvent::DnsStart => Some(Boundary::Start(Phase::DnsLookup)),
            PhaseEvent::DnsDone => Some(Boundary::End(Phase::DnsLookup)),
            PhaseEvent::ConnectStart => Some(Boundary::Start(Phase::Connect)),
            PhaseEvent::ConnectDone => Some(Boundary::End(Phase::Connect)),
            PhaseEvent::TlsHandshakeStart => Some(Boundary::Start(Phase::TlsHandshake)),
            PhaseEvent::TlsHandshakeDone => Some(Boundary::End(Phase::TlsHandshake)),
            PhaseEvent::WroteRequest => Some(Boundary::Start(Phase::ServerProcessing)),
            PhaseEvent::GotFirstResponseByte => Some(Boundary::End(Phase::ServerProcessing)),
        }
    }

    /// Bit used to detect an event firing twice for the same request.
    pub(crate) fn bit(self) -> u16 {
        let index = match self {
            PhaseEvent::GotConn { .. } => 0,
            PhaseEvent::DnsStart => 1,
            PhaseEvent::DnsDone => 2,
            PhaseEvent::ConnectStart => 3,
            PhaseEvent::ConnectDone => 4,
            PhaseEvent::TlsHandshakeStart => 5,
            PhaseEvent::TlsHandshakeDone => 6,
            PhaseEvent::WroteRequest => 7,
            PhaseEvent::GotFirstResponseByte => 8,
        };
        1 << index
    }
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        let names: Vec<_> = Phase::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            ["DNSLookup", "Connect", "TLSHandshake", "ServerProcessing"]
        );
    }

    #[test]
    fn test_boundaries_pair_up() {
        for phase in Phase::ALL {
            let starts = [
                PhaseEvent::DnsStart,
                PhaseEvent::ConnectStart,
                PhaseEvent::TlsHandshakeStart,
                PhaseEvent::WroteRequest,
            ]
            .iter()
            .filter(|e| e.boundary() == Some(Boundary::Start(phase)))
            .count();
            assert_eq!(starts, 1, "{phase} should have exactly one start event");
        }
        assert_eq!(PhaseEvent::GotConn { reused: true }.boundary(), None);
    }

    #[test]
    fn test_bits_are_distinct_and_ignore_payload() {
        let events = [
            PhaseEvent::GotConn { reused: false },
            PhaseEvent::DnsStart,
            PhaseEvent::DnsDone,
            PhaseEvent::ConnectStart,
            PhaseEvent::ConnectDone,
            PhaseEvent::TlsHandshakeStart,
            PhaseEvent::TlsHandshakeDone,
            PhaseEvent::WroteRequest,
            PhaseEvent::GotFirstResponseByte,
        ];
        let mut seen = 0u16;
        for event in events {
            assert_eq!(seen & event.bit(), 0, "{event} shares a bit");
            seen |= event.bit();
        }
        assert_eq!(
            PhaseEvent::GotConn { reused: true }.bit(),
            PhaseEvent::GotConn { reused: false }.bit()
        );
    }
}
