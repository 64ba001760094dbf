//! Request execution that reports every lifecycle event.
//!
//! [`TracingClient`] is a small HTTP/1.1 client: one request per
//! call, no redirects, no retries. It exists to drive an
//! [`ExecutionContext`] through a real connection lifecycle, including the
//! keep-alive reuse branch.

use super::io::{IoProbe, TracedIo};
use super::pool::{IdlePool, PooledConnection};
use super::target::{Origin, Target};
use super::types::{TracedRequest, TracedResponse};
use crate::config::Config;
use crate::error::TraceError;
use crate::infra::dns::{DnsResolver, HickoryDnsResolver};
use crate::infra::tls::{connect_tls, RustlsTlsProvider, TlsProvider};
use crate::track::{ExecutionContext, PhaseEvent, PhaseTracker};
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Bytes,
    client::conn::http1::SendRequest,
    header::{HeaderName, HOST},
    Method, Request, Version,
};
use hyper_util::rt::TokioIo;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    str::FromStr,
    sync::Arc,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::{mpsc, Mutex},
    time::timeout,
};

/// How long a pooled connection may take to report ready before it is dropped.
const IDLE_READY_TIMEOUT: Duration = Duration::from_secs(1);

type ResponseParts = (u16, HashMap<String, String>, Version, Bytes);

pub struct TracingClient<R = HickoryDnsResolver, T = RustlsTlsProvider> {
    config: Config,
    resolver: R,
    tls: T,
    pool: Mutex<IdlePool>,
}

impl TracingClient {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_components(config, HickoryDnsResolver::new(), RustlsTlsProvider::new())
    }
}

impl Default for TracingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DnsResolver, T: TlsProvider> TracingClient<R, T> {
    pub fn with_components(config: Config, resolver: R, tls: T) -> Self {
        let pool = Mutex::new(IdlePool::new(config.max_idle_per_origin));
        Self {
            config,
            resolver,
            tls,
            pool,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A fresh tracker using this client's configured total anchor.
    pub fn tracker(&self) -> PhaseTracker {
        PhaseTracker::with_anchor(self.config.total_anchor)
    }

    /// Number of idle connections held for the origin of `url`.
    pub async fn idle_connections(&self, url: &str) -> Result<usize, TraceError> {
        let target = Target::from_url(url)?;
        Ok(self.pool.lock().await.idle_count(&target.origin))
    }

    /// Executes `request`, reporting lifecycle events to the sinks attached
    /// to `ctx`, and returns once the response body has been fully read.
    ///
    /// On failure the sinks keep whatever events fired before it.
    pub async fn execute(
        &self,
        request: TracedRequest,
        mut ctx: ExecutionContext<'_>,
    ) -> Result<TracedResponse, TraceError> {
        let target = Target::from_url(&request.url)?;
        let request_timeout = ctx.timeout().unwrap_or(self.config.request_timeout);
        let http_request = build_http_request(&request, &target)?;

        let (mut conn, reused) = match self.checkout(&target.origin).await {
            Some(conn) => (conn, true),
            None => (self.dial(&target, &mut ctx, request_timeout).await?, false),
        };
        ctx.emit(PhaseEvent::GotConn { reused });
        tracing::debug!(
            origin = %target.origin,
            remote = %conn.remote_addr,
            reused,
            "connection obtained"
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        conn.probe.arm(tx);
        let result = round_trip(&mut conn.sender, http_request, request_timeout).await;
        conn.probe.disarm();
        while let Ok((event, at)) = rx.try_recv() {
            ctx.emit_at(event, at);
        }
        let (status, headers, version, body) = result?;

        let remote_addr = conn.remote_addr;
        self.pool.lock().await.put(target.origin, conn);

        Ok(TracedResponse {
            status,
            headers,
            version,
            body,
            remote_addr,
            reused,
        })
    }

    async fn checkout(&self, origin: &Origin) -> Option<PooledConnection> {
        loop {
            let mut conn = self.pool.lock().await.take(origin)?;
            match timeout(IDLE_READY_TIMEOUT, conn.sender.ready()).await {
                Ok(Ok(())) => return Some(conn),
                _ => tracing::debug!(%origin, "dropping stale idle connection"),
            }
        }
    }

    async fn dial(
        &self,
        target: &Target,
        ctx: &mut ExecutionContext<'_>,
        request_timeout: Duration,
    ) -> Result<PooledConnection, TraceError> {
        let origin = &target.origin;

        let ips = match target.literal_ip {
            Some(ip) => vec![ip],
            None => {
                ctx.emit(PhaseEvent::DnsStart);
                let resolved = timeout(request_timeout, self.resolver.resolve(&origin.host)).await;
                ctx.emit(PhaseEvent::DnsDone);
                match resolved {
                    Ok(result) => result?.ips,
                    Err(_) => return Err(TraceError::Timeout("DNS lookup timed out".to_string())),
                }
            }
        };

        ctx.emit(PhaseEvent::ConnectStart);
        let connected = connect_any(&ips, origin.port, request_timeout).await;
        ctx.emit(PhaseEvent::ConnectDone);
        let (tcp_stream, remote_addr) = connected?;

        let probe = Arc::new(IoProbe::default());
        let sender = if origin.is_https {
            ctx.emit(PhaseEvent::TlsHandshakeStart);
            let handshake =
                timeout(request_timeout, connect_tls(&self.tls, tcp_stream, &origin.host)).await;
            ctx.emit(PhaseEvent::TlsHandshakeDone);
            let tls_stream = match handshake {
                Ok(result) => result?,
                Err(_) => {
                    return Err(TraceError::Timeout("TLS handshake timed out".to_string()))
                }
            };
            http1_handshake(TracedIo::new(tls_stream, probe.clone())).await?
        } else {
            http1_handshake(TracedIo::new(tcp_stream, probe.clone())).await?
        };

        Ok(PooledConnection {
            sender,
            probe,
            remote_addr,
        })
    }
}

/// Dials each address in order and keeps the first that connects.
async fn connect_any(
    ips: &[IpAddr],
    port: u16,
    request_timeout: Duration,
) -> Result<(TcpStream, SocketAddr), TraceError> {
    let mut last_error = None;
    for ip in ips {
        let addr = SocketAddr::new(*ip, port);
        match timeout(request_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => return Ok((stream, addr)),
            Ok(Err(e)) => {
                tracing::debug!(%addr, error = %e, "connect failed");
                last_error = Some(TraceError::Connect(format!("{}: {}", addr, e)));
            }
            Err(_) => {
                last_error = Some(TraceError::Timeout(format!(
                    "TCP connection to {} timed out",
                    addr
                )));
            }
        }
    }
    Err(last_error.unwrap_or_else(|| TraceError::Connect("no addresses to dial".to_string())))
}

async fn http1_handshake<S>(io: TracedIo<S>) -> Result<SendRequest<Full<Bytes>>, TraceError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::warn!("Connection error: {}", e);
        }
    });

    Ok(sender)
}

/// Builds an HTTP/1.1 request for `target`.
fn build_http_request(
    request: &TracedRequest,
    target: &Target,
) -> Result<Request<Full<Bytes>>, TraceError> {
    let method = Method::from_str(&request.method.to_uppercase())
        .map_err(|_| TraceError::InvalidRequest(format!("invalid method: {}", request.method)))?;

    let mut builder = Request::builder()
        .method(method)
        .uri(&target.path)
        .header(HOST, &target.host_header);

    for (key, value) in &request.headers {
        let name = HeaderName::from_str(key)
            .map_err(|_| TraceError::InvalidRequest(format!("invalid header name: {}", key)))?;
        builder = builder.header(name, value);
    }

    let body = request.body.clone().unwrap_or_default();
    builder
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| TraceError::InvalidRequest(e.to_string()))
}

/// Sends the request and drains the response body.
async fn round_trip(
    sender: &mut SendRequest<Full<Bytes>>,
    req: Request<Full<Bytes>>,
    request_timeout: Duration,
) -> Result<ResponseParts, TraceError> {
    let response = match timeout(request_timeout, sender.send_request(req)).await {
        Ok(result) => result?,
        Err(_) => return Err(TraceError::Timeout("request timed out".to_string())),
    };

    let version = response.version();
    let status = response.status().as_u16();
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    let body = match timeout(request_timeout, response.into_body().collect()).await {
        Ok(collected) => collected?.to_bytes(),
        Err(_) => return Err(TraceError::Timeout("body read timed out".to_string())),
    };

    Ok((status, headers, version, body))
}
