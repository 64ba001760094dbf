use hyper::{body::Bytes, Version};
use std::collections::HashMap;
use std::net::SocketAddr;

/// A request to execute under tracing.
#[derive(Debug, Clone)]
pub struct TracedRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl TracedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A fully drained response.
#[derive(Debug, Clone)]
pub struct TracedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub version: Version,
    pub body: Bytes,
    pub remote_addr: SocketAddr,
    /// Whether the request went over a pooled connection.
    pub reused: bool,
}

impl TracedResponse {
    pub fn protocol(&self) -> &'static str {
        version_to_string(self.version)
    }
}

/// Converts an HTTP version to its string representation.
pub fn version_to_string(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
}
