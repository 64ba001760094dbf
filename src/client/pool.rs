//! Idle keep-alive connections, keyed by origin.

use super::io::IoProbe;
use super::target::Origin;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::client::conn::http1::SendRequest;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

pub(crate) struct PooledConnection {
    pub sender: SendRequest<Full<Bytes>>,
    pub probe: Arc<IoProbe>,
    pub remote_addr: SocketAddr,
}

pub(crate) struct IdlePool {
    idle: HashMap<Origin, Vec<PooledConnection>>,
    max_idle_per_origin: usize,
}

impl IdlePool {
    pub fn new(max_idle_per_origin: usize) -> Self {
        Self {
            idle: HashMap::new(),
            max_idle_per_origin,
        }
    }

    /// Most recently returned open connection for `origin`, if any.
    pub fn take(&mut self, origin: &Origin) -> Option<PooledConnection> {
        let slot = self.idle.get_mut(origin)?;
        let mut found = None;
        while let Some(conn) = slot.pop() {
            if !conn.sender.is_closed() {
                found = Some(conn);
                break;
            }
        }
        if slot.is_empty() {
            self.idle.remove(origin);
        }
        found
    }

    pub fn put(&mut self, origin: Origin, conn: PooledConnection) {
        if self.max_idle_per_origin == 0 || conn.sender.is_closed() {
            return;
        }
        let slot = self.idle.entry(origin).or_default();
        if slot.len() < self.max_idle_per_origin {
            slot.push(conn);
        }
    }

    pub fn idle_count(&self, origin: &Origin) -> usize {
        self.idle.get(origin).map_or(0, Vec::len)
    }
}
