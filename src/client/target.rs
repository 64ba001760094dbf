//! URL to connection target resolution.

use crate::error::TraceError;
use std::fmt;
use std::net::IpAddr;

/// Scheme, host and port: connections are only reused within one origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub is_https: bool,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.is_https { "https" } else { "http" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Everything needed to dial and address one request.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub origin: Origin,
    /// Set when the URL host is an IP literal; DNS is skipped for these.
    pub literal_ip: Option<IpAddr>,
    pub path: String,
    pub host_header: String,
}

impl Target {
    pub fn from_url(url: &str) -> Result<Self, TraceError> {
        let parsed =
            url::Url::parse(url).map_err(|e| TraceError::InvalidUrl(format!("{}: {}", url, e)))?;

        let is_https = match parsed.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(TraceError::InvalidUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        };

        let (host, literal_ip) = match parsed.host() {
            Some(url::Host::Domain(domain)) => (domain.to_string(), None),
            Some(url::Host::Ipv4(ip)) => (ip.to_string(), Some(IpAddr::V4(ip))),
            Some(url::Host::Ipv6(ip)) => (ip.to_string(), Some(IpAddr::V6(ip))),
            None => return Err(TraceError::InvalidUrl("URL has no host".to_string())),
        };

        let port = parsed
            .port_or_known_default()
            .unwrap_or(if is_https { 443 } else { 80 });

        let path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };

        // host_str keeps the brackets around IPv6 literals, which Host needs.
        let authority = parsed.host_str().unwrap_or(&host);
        let host_header = match parsed.port() {
            Some(port) => format!("{}:{}", authority, port),
            None => authority.to_string(),
        };

        Ok(Self {
            origin: Origin {
                is_https,
                host,
                port,
            },
            literal_ip,
            path,
            host_header,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_defaults() {
        let target = Target::from_url("https://example.com").unwrap();
        assert!(target.origin.is_https);
        assert_eq!(target.origin.host, "example.com");
        assert_eq!(target.origin.port, 443);
        assert_eq!(target.path, "/");
        assert_eq!(target.host_header, "example.com");
        assert!(target.literal_ip.is_none());
    }

    #[test]
    fn test_explicit_port_and_query() {
        let target = Target::from_url("http://localhost:8080/a/b?x=1").unwrap();
        assert!(!target.origin.is_https);
        assert_eq!(target.origin.port, 8080);
        assert_eq!(target.path, "/a/b?x=1");
        assert_eq!(target.host_header, "localhost:8080");
        assert_eq!(target.origin.to_string(), "http://localhost:8080");
    }

    #[test]
    fn test_literal_ips_skip_dns() {
        let v4 = Target::from_url("http://127.0.0.1:9000/").unwrap();
        assert_eq!(v4.literal_ip, Some("127.0.0.1".parse().unwrap()));

        let v6 = Target::from_url("http://[::1]:9000/").unwrap();
        assert_eq!(v6.literal_ip, Some("::1".parse().unwrap()));
        assert_eq!(v6.origin.host, "::1");
        assert_eq!(v6.host_header, "[::1]:9000");
    }

    #[test]
    fn test_rejects_bad_urls() {
        let err = Target::from_url("not a url").unwrap_err();
        assert_eq!(err.code(), "INVALID_URL");

        let err = Target::from_url("ftp://example.com/file").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }
}
