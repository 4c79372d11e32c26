//! Cache Configuration
//!
//! Immutable configuration for the tiered cache: remote endpoints, timeouts,
//! keepalive pooling, backoff window, and the key namespaces that isolate
//! this cache's entries inside shared storage.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default memcached port, used when an endpoint string carries no port.
pub const DEFAULT_PORT: u16 = 11211;

/// Default connect/operation timeout. Deliberately tiny: this cache sits on
/// a latency-sensitive request path and a slow remote must never stall it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20);

/// Default keepalive horizon for pooled connections.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(60);

/// Default keepalive pool size per endpoint.
pub const DEFAULT_POOL_SIZE: usize = 100;

/// Default backoff window after a primary connect failure.
pub const DEFAULT_PRIMARY_BACKOFF: Duration = Duration::from_secs(10);

/// Default TTL for local fallback entries written while remote is down.
pub const DEFAULT_FALLBACK_TTL: Duration = Duration::from_secs(120);

/// Default prefix isolating this cache's keys in the remote namespace.
pub const DEFAULT_KEY_PREFIX: &str = "crowdsec:captcha:";

/// Default prefix isolating fallback copies inside the shared local store.
pub const DEFAULT_FALLBACK_PREFIX: &str = "memc_fallback/";

/// Default shared-state key holding the primary-down-until marker.
pub const DEFAULT_DOWN_MARKER_KEY: &str = "memc_primary_down_until";

/// A remote cache server endpoint (value object).
///
/// Parsed once at construction from a `"host:port"` or bare `"host"`
/// configuration string. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from explicit parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a `"host:port"` or bare `"host"` string (bare host defaults to
    /// port 11211).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Config("empty server endpoint".to_string()));
        }

        match raw.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(Error::Config(format!("missing host in endpoint: {raw}")));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("invalid port in endpoint: {raw}")))?;
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(raw, DEFAULT_PORT)),
        }
    }

    /// Get the host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Tiered cache configuration.
///
/// All fields are optional at the call site via `Default`; absence of both
/// `primary` and `backup` is valid and puts the cache in local-only mode.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Primary remote endpoint, tried first.
    pub primary: Option<Endpoint>,
    /// Backup remote endpoint, tried when primary is down or backed off.
    pub backup: Option<Endpoint>,
    /// Connect/operation timeout per remote attempt.
    pub timeout: Duration,
    /// How long a released connection stays reusable in the pool.
    pub keepalive: Duration,
    /// Keepalive pool size per endpoint.
    pub pool_size: usize,
    /// Backoff window applied after a primary connect failure.
    pub primary_backoff: Duration,
    /// Prefix applied to every key before touching remote storage.
    pub key_prefix: String,
    /// TTL for fallback entries when the caller supplied none.
    pub fallback_ttl: Duration,
    /// Shared-state key holding the primary-down-until marker.
    pub down_marker_key: String,
    /// Prefix isolating fallback copies inside the shared local store.
    pub fallback_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            primary: None,
            backup: None,
            timeout: DEFAULT_TIMEOUT,
            keepalive: DEFAULT_KEEPALIVE,
            pool_size: DEFAULT_POOL_SIZE,
            primary_backoff: DEFAULT_PRIMARY_BACKOFF,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            fallback_ttl: DEFAULT_FALLBACK_TTL,
            down_marker_key: DEFAULT_DOWN_MARKER_KEY.to_string(),
            fallback_prefix: DEFAULT_FALLBACK_PREFIX.to_string(),
        }
    }
}

impl CacheConfig {
    /// Create a configuration with endpoints parsed from raw option strings,
    /// everything else at defaults.
    pub fn with_servers(primary: Option<&str>, backup: Option<&str>) -> Result<Self> {
        let mut config = Self::default();
        config.primary = primary.map(Endpoint::parse).transpose()?;
        config.backup = backup.map(Endpoint::parse).transpose()?;
        Ok(config)
    }

    /// True when at least one remote endpoint is configured.
    pub fn has_remote(&self) -> bool {
        self.primary.is_some() || self.backup.is_some()
    }

    /// Derive the remote key for a logical key.
    pub fn remote_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Derive the fallback-store key for a logical key. Keeps fallback
    /// copies disjoint from the down-until marker inside shared state.
    pub fn fallback_key(&self, key: &str) -> String {
        format!("{}{}", self.fallback_prefix, key)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_endpoint_parse_host_port() {
        let endpoint = Endpoint::parse("cache-1.internal:11212").unwrap();
        assert_eq!(endpoint.host(), "cache-1.internal");
        assert_eq!(endpoint.port(), 11212);
    }

    #[test]
    fn test_endpoint_parse_bare_host_defaults_port() {
        let endpoint = Endpoint::parse("cache-1.internal").unwrap();
        assert_eq!(endpoint.host(), "cache-1.internal");
        assert_eq!(endpoint.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_endpoint_parse_rejects_bad_input() {
        assert!(Endpoint::parse("").is_err());
        assert!(Endpoint::parse("   ").is_err());
        assert!(Endpoint::parse("host:notaport").is_err());
        assert!(Endpoint::parse("host:99999").is_err());
        assert!(Endpoint::parse(":11211").is_err());
    }

    #[test]
    fn test_endpoint_display_round_trip() {
        let endpoint = Endpoint::new("10.0.0.1", 11211);
        assert_eq!(endpoint.to_string(), "10.0.0.1:11211");

        let parsed: Endpoint = "10.0.0.1:11211".parse().unwrap();
        assert_eq!(parsed, endpoint);
    }

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::default();

        assert!(config.primary.is_none());
        assert!(config.backup.is_none());
        assert!(!config.has_remote());
        assert_eq!(config.timeout, Duration::from_millis(20));
        assert_eq!(config.keepalive, Duration::from_secs(60));
        assert_eq!(config.pool_size, 100);
        assert_eq!(config.primary_backoff, Duration::from_secs(10));
        assert_eq!(config.fallback_ttl, Duration::from_secs(120));
        assert_eq!(config.key_prefix, "crowdsec:captcha:");
        assert_eq!(config.fallback_prefix, "memc_fallback/");
    }

    #[test]
    fn test_with_servers() {
        let config =
            CacheConfig::with_servers(Some("primary.internal:11211"), Some("backup.internal"))
                .unwrap();

        assert_eq!(config.primary.as_ref().unwrap().host(), "primary.internal");
        assert_eq!(config.backup.as_ref().unwrap().port(), DEFAULT_PORT);
        assert!(config.has_remote());

        assert!(CacheConfig::with_servers(Some("bad:port:"), None).is_err());
    }

    #[test]
    fn test_key_derivation() {
        let config = CacheConfig::default();

        assert_eq!(
            config.remote_key("captcha_1.2.3.4"),
            "crowdsec:captcha:captcha_1.2.3.4"
        );
        assert_eq!(
            config.fallback_key("captcha_1.2.3.4"),
            "memc_fallback/captcha_1.2.3.4"
        );
        // The two namespaces must never collide.
        assert_ne!(config.remote_key("k"), config.fallback_key("k"));
    }

    proptest! {
        #[test]
        fn prop_endpoint_parse_round_trips(
            host in "[a-z][a-z0-9.-]{0,24}",
            port in 0u16..=u16::MAX,
        ) {
            let raw = format!("{host}:{port}");
            let endpoint = Endpoint::parse(&raw).unwrap();
            prop_assert_eq!(endpoint.host(), host.as_str());
            prop_assert_eq!(endpoint.port(), port);
            prop_assert_eq!(endpoint.to_string(), raw);
        }

        #[test]
        fn prop_bare_host_gets_default_port(host in "[a-z][a-z0-9.-]{0,24}") {
            let endpoint = Endpoint::parse(&host).unwrap();
            prop_assert_eq!(endpoint.port(), DEFAULT_PORT);
        }
    }
}
