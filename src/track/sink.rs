//! The capability set a request-execution layer reports lifecycle events to.

use super::event::PhaseEvent;
use super::tracker::PhaseTracker;
use std::time::Instant;

/// Receiver of lifecycle events for one request.
///
/// Implementors only need [`on_event`](Self::on_event); the named methods are
/// conveniences that route through it. An execution layer must invoke each
/// event at most once per request and never before the matching start event.
pub trait PhaseEventSink {
    fn on_event(&mut self, event: PhaseEvent, at: Instant);

    fn on_got_conn(&mut self, reused: bool, at: Instant) {
        self.on_event(PhaseEvent::GotConn { reused }, at);
    }

    fn on_dns_start(&mut self, at: Instant) {
        self.on_event(PhaseEvent::DnsStart, at);
    }

    fn on_dns_done(&mut self, at: Instant) {
        self.on_event(PhaseEvent::DnsDone, at);
    }

    fn on_connect_start(&mut self, at: Instant) {
        self.on_event(PhaseEvent::ConnectStart, at);
    }

    fn on_connect_done(&mut self, at: Instant) {
        self.on_event(PhaseEvent::ConnectDone, at);
    }

    fn on_tls_handshake_start(&mut self, at: Instant) {
        self.on_event(PhaseEvent::TlsHandshakeStart, at);
    }

    fn on_tls_handshake_done(&mut self, at: Instant) {
        self.on_event(PhaseEvent::TlsHandshakeDone, at);
    }

    fn on_wrote_request(&mut self, at: Instant) {
        self.on_event(PhaseEvent::WroteRequest, at);
    }

    fn on_got_first_response_byte(&mut self, at: Instant) {
        self.on_event(PhaseEvent::GotFirstResponseByte, at);
    }
}

impl PhaseEventSink for PhaseTracker {
    fn on_event(&mut self, event: PhaseEvent, at: Instant) {
        self.apply(event, at);
    }
}

impl<F> PhaseEventSink for F
where
    F: FnMut(PhaseEvent, Instant),
{
    fn on_event(&mut self, event: PhaseEvent, at: Instant) {
        self(event, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Phase;
    use std::time::Duration;

    #[test]
    fn test_named_callbacks_drive_tracker() {
        let t0 = Instant::now();
        let mut tracker = PhaseTracker::new();
        tracker.on_dns_start(t0);
        tracker.on_dns_done(t0 + Duration::from_millis(3));
        tracker.on_connect_start(t0 + Duration::from_millis(3));
        tracker.on_connect_done(t0 + Duration::from_millis(5));
        tracker.on_tls_handshake_start(t0 + Duration::from_millis(5));
        tracker.on_tls_handshake_done(t0 + Duration::from_millis(9));
        tracker.on_got_conn(false, t0 + Duration::from_millis(9));
        tracker.on_wrote_request(t0 + Duration::from_millis(10));
        tracker.on_got_first_response_byte(t0 + Duration::from_millis(16));

        assert!(tracker.uses_tls());
        assert_eq!(tracker.duration(Phase::TlsHandshake), Duration::from_millis(4));
        assert_eq!(tracker.total(), Duration::from_millis(16));
    }

    #[test]
    fn test_closure_sink() {
        let mut events = Vec::new();
        {
            let mut sink = |event: PhaseEvent, _at: Instant| events.push(event);
            sink.on_got_conn(true, Instant::now());
            sink.on_wrote_request(Instant::now());
        }
        assert_eq!(
            events,
            [PhaseEvent::GotConn { reused: true }, PhaseEvent::WroteRequest]
        );
    }
}
