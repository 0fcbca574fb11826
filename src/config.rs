//! Resolver configuration.
//!
//! Configuration is established once at startup and never mutated afterwards;
//! engines hold it behind an `Arc` and read it concurrently.

use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ResolverError;

/// DID method served by default
pub const DEFAULT_DID_METHOD: &str = "cheqd";

/// Namespace assumed when a DID omits it
pub const DEFAULT_NAMESPACE: &str = "mainnet";

const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable, process-wide resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// The DID method this resolver answers for
    pub did_method: String,
    /// Ledger REST gateway for each recognized namespace
    pub endpoints: BTreeMap<String, Url>,
    /// Deadline applied to every ledger query
    pub ledger_timeout: Duration,
    /// Whether resolution metadata carries a `retrieved` timestamp
    pub stamp_retrieved: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        if let Ok(url) = Url::parse("https://api.cheqd.net") {
            endpoints.insert("mainnet".to_string(), url);
        }
        if let Ok(url) = Url::parse("https://api.cheqd.network") {
            endpoints.insert("testnet".to_string(), url);
        }

        Self {
            did_method: DEFAULT_DID_METHOD.to_string(),
            endpoints,
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
            stamp_retrieved: false,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables, reading `.env` first
    ///
    /// * `RESOLVER_DID_METHOD` - method name (default `cheqd`)
    /// * `RESOLVER_NAMESPACES` - `name=url` pairs separated by commas
    /// * `RESOLVER_LEDGER_TIMEOUT_SECS` - ledger deadline in seconds
    /// * `RESOLVER_STAMP_RETRIEVED` - `true` to add `retrieved` to metadata
    pub fn from_env() -> Result<Self, ResolverError> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(method) = env::var("RESOLVER_DID_METHOD") {
            let method = method.trim();
            if method.is_empty() || !method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
                return Err(ResolverError::Config(format!("invalid DID method: {method:?}")));
            }
            config.did_method = method.to_string();
        }

        if let Ok(namespaces) = env::var("RESOLVER_NAMESPACES") {
            config.endpoints = parse_endpoints(&namespaces)?;
        }

        if let Ok(timeout) = env::var("RESOLVER_LEDGER_TIMEOUT_SECS") {
            let secs: u64 = timeout
                .trim()
                .parse()
                .map_err(|_| ResolverError::Config(format!("invalid ledger timeout: {timeout:?}")))?;
            if secs == 0 {
                return Err(ResolverError::Config("ledger timeout must be positive".to_string()));
            }
            config.ledger_timeout = Duration::from_secs(secs);
        }

        if let Ok(stamp) = env::var("RESOLVER_STAMP_RETRIEVED") {
            config.stamp_retrieved = stamp
                .trim()
                .parse()
                .map_err(|_| ResolverError::Config(format!("invalid boolean: {stamp:?}")))?;
        }

        Ok(config)
    }

    /// Recognized namespaces, in sorted order
    pub fn namespaces(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    /// Gateway for a namespace; an empty namespace means the default one
    pub fn endpoint(&self, namespace: &str) -> Option<&Url> {
        let namespace = if namespace.is_empty() { DEFAULT_NAMESPACE } else { namespace };
        self.endpoints.get(namespace)
    }
}

/// Parses `mainnet=https://a,testnet=https://b`
fn parse_endpoints(raw: &str) -> Result<BTreeMap<String, Url>, ResolverError> {
    let mut endpoints = BTreeMap::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, url) = pair
            .split_once('=')
            .ok_or_else(|| ResolverError::Config(format!("expected name=url, got {pair:?}")))?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ResolverError::Config(format!("invalid namespace: {name:?}")));
        }
        endpoints.insert(name.to_string(), Url::parse(url.trim())?);
    }

    if endpoints.is_empty() {
        return Err(ResolverError::Config("at least one namespace is required".to_string()));
    }

    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.did_method, "cheqd");
        assert_eq!(config.namespaces(), vec!["mainnet".to_string(), "testnet".to_string()]);
        assert_eq!(config.ledger_timeout, Duration::from_secs(5));
        assert!(!config.stamp_retrieved);
    }

    #[test]
    fn test_empty_namespace_uses_mainnet() {
        let config = ResolverConfig::default();
        assert_eq!(config.endpoint("").unwrap().as_str(), "https://api.cheqd.net/");
        assert_eq!(config.endpoint("testnet").unwrap().as_str(), "https://api.cheqd.network/");
        assert!(config.endpoint("devnet").is_none());
    }

    #[test]
    fn test_parse_endpoints() {
        let endpoints = parse_endpoints("testnet=http://localhost:1317, local = http://127.0.0.1:9000").unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints["local"].as_str(), "http://127.0.0.1:9000/");

        assert!(matches!(parse_endpoints("testnet"), Err(ResolverError::Config(_))));
        assert!(matches!(parse_endpoints("test-net=http://x"), Err(ResolverError::Config(_))));
        assert!(matches!(parse_endpoints(""), Err(ResolverError::Config(_))));
        assert!(matches!(parse_endpoints("testnet=not a url"), Err(ResolverError::UrlError(_))));
    }
}
