use crate::track::TotalAnchor;
use std::env;
use std::time::Duration;

/// Default per-stage timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Per-stage timeout, applied separately to the DNS lookup, each connect
    /// attempt, the TLS handshake, sending the request and reading the body.
    /// A whole request can take several times this long.
    pub request_timeout: Duration,
    pub total_anchor: TotalAnchor,
    /// Idle keep-alive connections kept per origin. Zero disables reuse.
    pub max_idle_per_origin: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            total_anchor: TotalAnchor::DnsStart,
            max_idle_per_origin: 1,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            request_timeout: lookup("HTTPTRACK_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            total_anchor: lookup("HTTPTRACK_TOTAL_ANCHOR")
                .and_then(|v| parse_anchor(&v))
                .unwrap_or(defaults.total_anchor),
            max_idle_per_origin: lookup("HTTPTRACK_MAX_IDLE_PER_ORIGIN")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_idle_per_origin),
        }
    }
}

fn parse_anchor(value: &str) -> Option<TotalAnchor> {
    match value.trim().to_ascii_lowercase().as_str() {
        "dns" | "dns_start" => Some(TotalAnchor::DnsStart),
        "connection" | "connection_acquired" => Some(TotalAnchor::ConnectionAcquired),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.total_anchor, TotalAnchor::DnsStart);
        assert_eq!(config.max_idle_per_origin, 1);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HTTPTRACK_TIMEOUT_MS", "1500"),
            ("HTTPTRACK_TOTAL_ANCHOR", "Connection"),
            ("HTTPTRACK_MAX_IDLE_PER_ORIGIN", "0"),
        ]);
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.total_anchor, TotalAnchor::ConnectionAcquired);
        assert_eq!(config.max_idle_per_origin, 0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("HTTPTRACK_TIMEOUT_MS", "soon"),
            ("HTTPTRACK_TOTAL_ANCHOR", "tcp"),
        ]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.total_anchor, TotalAnchor::DnsStart);
    }
}
