//! DNS resolution infrastructure.
//!
//! Provides a trait-based abstraction for DNS resolution so the client can be
//! pointed at a fixed address table in tests.

use crate::error::TraceError;
use hickory_resolver::{config::*, TokioAsyncResolver};
use std::{net::IpAddr, sync::Arc};
use tokio::sync::OnceCell;

/// Resolved addresses for one host, in the order they should be dialed.
#[derive(Debug)]
pub struct DnsResult {
    pub ips: Vec<IpAddr>,
}

/// Trait for DNS resolution.
///
/// Callers only invoke this for hostnames; literal IP addresses never reach
/// the resolver, so no DNS events are reported for them.
#[allow(async_fn_in_trait)]
pub trait DnsResolver: Send + Sync {
    /// Resolves a hostname to a non-empty list of IP addresses.
    async fn resolve(&self, host: &str) -> Result<DnsResult, TraceError>;
}

/// Global DNS resolver instance, shared by every client in the process.
static DNS_RESOLVER: OnceCell<Arc<TokioAsyncResolver>> = OnceCell::const_new();

async fn get_resolver() -> Arc<TokioAsyncResolver> {
    DNS_RESOLVER
        .get_or_init(|| async {
            Arc::new(TokioAsyncResolver::tokio(
                ResolverConfig::default(),
                ResolverOpts::default(),
            ))
        })
        .await
        .clone()
}

/// DNS resolver implementation using hickory-resolver.
#[derive(Debug, Default, Clone)]
pub struct HickoryDnsResolver;

impl HickoryDnsResolver {
    pub fn new() -> Self {
        Self
    }
}

impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, host: &str) -> Result<DnsResult, TraceError> {
        let resolver = get_resolver().await;
        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| TraceError::Dns(format!("{}: {}", host, e)))?;

        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(TraceError::Dns(format!("{}: no addresses", host)));
        }
        tracing::debug!(host, ?ips, "resolved");
        Ok(DnsResult { ips })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_localhost() {
        let result = HickoryDnsResolver::new().resolve("localhost").await.unwrap();
        assert!(result.ips.iter().all(|ip| ip.is_loopback()));
        assert!(!result.ips.is_empty());
    }
}
