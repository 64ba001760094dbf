#![allow(dead_code)]

use http_track::error::TraceError;
use http_track::infra::{DnsResolver, DnsResult, RustlsTlsProvider};
use http_track::{Config, TracingClient};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http_track=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Resolves every host to 127.0.0.1 after a short delay, so DNS is
/// measurable without touching the network.
pub struct StaticResolver {
    pub delay: Duration,
}

impl DnsResolver for StaticResolver {
    async fn resolve(&self, _host: &str) -> Result<DnsResult, TraceError> {
        tokio::time::sleep(self.delay).await;
        Ok(DnsResult {
            ips: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        })
    }
}

pub type LocalClient = TracingClient<StaticResolver, RustlsTlsProvider>;

pub fn local_client(config: Config) -> LocalClient {
    local_client_with_dns_delay(config, Duration::from_millis(2))
}

pub fn local_client_with_dns_delay(config: Config, delay: Duration) -> LocalClient {
    TracingClient::with_components(config, StaticResolver { delay }, RustlsTlsProvider::new())
}

/// Plain-text HTTP/1.1 keep-alive server answering every request with `hello`
/// after `delay`.
pub struct TestServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

impl TestServer {
    pub async fn spawn(delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_connection(stream, delay));
            }
        });

        Self { addr, connections }
    }

    /// URL addressed by name, so the client goes through DNS.
    pub fn url(&self) -> String {
        format!("http://tracked.test:{}/", self.addr.port())
    }

    /// URL addressed by IP literal, so the client skips DNS.
    pub fn ip_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn serve_connection(mut stream: TcpStream, delay: Duration) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };
        buf.drain(..end);

        tokio::time::sleep(delay).await;
        if stream.write_all(RESPONSE).await.is_err() {
            return;
        }
    }
}
