//! Infrastructure layer providing abstractions for external dependencies.
//!
//! This module contains traits and implementations for:
//! - DNS resolution
//! - TLS connections
//!
//! The client is generic over both, so tests can substitute fixed address
//! tables or custom trust roots.

pub mod dns;
pub mod tls;

pub use dns::{DnsResolver, DnsResult, HickoryDnsResolver};
pub use tls::{connect_tls, create_tls_config, RustlsTlsProvider, TlsProvider};
