use thiserror::Error;

/// Failure of a traced request. The tracker itself never fails; these come
/// from the execution layer.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("TCP connection failed: {0}")]
    Connect(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl TraceError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TraceError::InvalidUrl(_) => "INVALID_URL",
            TraceError::InvalidRequest(_) => "INVALID_REQUEST",
            TraceError::Dns(_) => "DNS_ERROR",
            TraceError::Connect(_) => "CONNECTION_FAILED",
            TraceError::Tls(_) => "TLS_ERROR",
            TraceError::Http(_) => "HTTP_ERROR",
            TraceError::Timeout(_) => "TIMEOUT",
        }
    }
}
