//! TLS/SSL infrastructure.
//!
//! Provides trait-based abstractions for TLS configuration and connection handling.

use crate::error::TraceError;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

/// Trait for TLS configuration providers.
pub trait TlsProvider: Send + Sync {
    fn client_config(&self) -> Result<Arc<rustls::ClientConfig>, TraceError>;

    fn connector(&self) -> Result<TlsConnector, TraceError> {
        Ok(TlsConnector::from(self.client_config()?))
    }
}

/// Default TLS provider: rustls with the ring backend and Mozilla's roots.
#[derive(Debug, Default, Clone)]
pub struct RustlsTlsProvider;

impl RustlsTlsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TlsProvider for RustlsTlsProvider {
    fn client_config(&self) -> Result<Arc<rustls::ClientConfig>, TraceError> {
        create_tls_config()
    }
}

/// Creates a TLS client configuration with Mozilla's root certificates.
///
/// The crypto provider is passed explicitly, so nothing has to be installed
/// as the process default first.
pub fn create_tls_config() -> Result<Arc<rustls::ClientConfig>, TraceError> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| TraceError::Tls(e.to_string()))?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Runs the TLS handshake over an established TCP stream.
pub async fn connect_tls<P: TlsProvider>(
    provider: &P,
    tcp_stream: TcpStream,
    server_name: &str,
) -> Result<TlsStream<TcpStream>, TraceError> {
    let connector = provider.connector()?;

    let server_name = ServerName::try_from(server_name.to_string())
        .map_err(|e| TraceError::Tls(format!("invalid server name: {}", e)))?;

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| TraceError::Tls(e.to_string()))
}
