//! Transport wrapper that observes request writes and response reads.
//!
//! The HTTP/1.1 connection driver owns the stream and runs on its own task,
//! so it cannot reach the caller's tracker directly. Instead each
//! [`TracedIo`] shares an [`IoProbe`] with the client; the client arms the
//! probe with a fresh channel per request and applies whatever the probe
//! timestamps once the response is back.

use crate::track::PhaseEvent;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

pub(crate) type EventSender = mpsc::UnboundedSender<(PhaseEvent, Instant)>;

#[derive(Debug, Default)]
struct ProbeState {
    tx: Option<EventSender>,
    last_write: Option<Instant>,
    flushed: bool,
    first_byte: bool,
}

impl ProbeState {
    fn send(&self, event: PhaseEvent, at: Instant) {
        if let Some(tx) = &self.tx {
            // The receiver is gone once the request has finished.
            let _ = tx.send((event, at));
        }
    }
}

/// Per-connection observation state, re-armed for every request.
///
/// The request counts as written at the first flush after a write. A server
/// may answer before that flush happens (an early `413` to a large upload);
/// the first response byte then closes the write side at the last completed
/// write, so `WroteRequest` still precedes `GotFirstResponseByte`.
#[derive(Debug, Default)]
pub(crate) struct IoProbe {
    state: Mutex<ProbeState>,
}

impl IoProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts reporting to `tx` for the next request on this connection.
    pub fn arm(&self, tx: EventSender) {
        *self.lock() = ProbeState {
            tx: Some(tx),
            ..ProbeState::default()
        };
    }

    pub fn disarm(&self) {
        self.lock().tx = None;
    }

    fn on_write(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        if state.tx.is_some() && !state.flushed {
            state.last_write = Some(now);
        }
    }

    fn on_flush(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        if state.last_write.is_some() && !state.flushed {
            state.flushed = true;
            state.send(PhaseEvent::WroteRequest, now);
        }
    }

    fn on_read(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        if state.tx.is_none() || state.first_byte {
            return;
        }
        if let (Some(written), false) = (state.last_write, state.flushed) {
            state.flushed = true;
            state.send(PhaseEvent::WroteRequest, written);
        }
        state.first_byte = true;
        state.send(PhaseEvent::GotFirstResponseByte, now);
    }
}

/// An async stream that reports its first flush and first read to an [`IoProbe`].
pub(crate) struct TracedIo<T> {
    inner: T,
    probe: Arc<IoProbe>,
}

impl<T> TracedIo<T> {
    pub fn new(inner: T, probe: Arc<IoProbe>) -> Self {
        Self { inner, probe }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for TracedIo<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(poll, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            self.probe.on_read();
        }
        poll
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for TracedIo<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if matches!(poll, Poll::Ready(Ok(n)) if n > 0) {
            self.probe.on_write();
        }
        poll
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write_vectored(cx, bufs);
        if matches!(poll, Poll::Ready(Ok(n)) if n > 0) {
            self.probe.on_write();
        }
        poll
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let poll = Pin::new(&mut self.inner).poll_flush(cx);
        if matches!(poll, Poll::Ready(Ok(()))) {
            self.probe.on_flush();
        }
        poll
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
