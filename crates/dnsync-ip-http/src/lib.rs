// # External Probe IP Resolver
//
// This crate provides the `external-probe` IP resolution strategy: the host's
// public IPv4 address as seen by a public IP-echo service.
//
// ## Purpose
//
// For hosts that are not cloud instances (home servers, NAT'd boxes) there is
// no API that knows their address. Asking an echo service from the host
// itself is the only way to learn it.
//
// ## Behaviour
//
// - One endpoint is picked uniformly at random per resolution, spreading load
//   across services and their rate limits
// - Exactly one GET is issued; a successful response is authoritative
// - The body must be JSON with an `ip` string field
// - Only IPv4 literals are accepted (A records)
//
// ## Trust Level
//
// ✅ Trusted for:
// - The address NAT exposes to the internet
//
// ❌ NOT trusted for:
// - Hosts with several egress paths (the echo service sees only one)
// - Availability (each service may rate limit or go away)

use dnsync_core::config::{ClientOptions, HostConfig};
use dnsync_core::traits::{IpResolver, IpResolverFactory, ResolvedAddress};
use dnsync_core::{Error, ProviderRegistry, Result};

use rand::seq::SliceRandom;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Method tags this strategy is registered under
pub const METHOD_TAGS: &[&str] = &["external-probe", "external"];

/// Default IP-echo services; each answers `{"ip": "..."}`
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://api.ipify.org?format=json",
    "https://ipinfo.io/json",
    "https://ifconfig.co/json",
];

/// Response body shared by all supported echo services
#[derive(Debug, Deserialize)]
struct EchoResponse {
    ip: String,
}

/// `external-probe` resolution strategy
pub struct ExternalProbeResolver {
    /// Candidate endpoints, never empty
    endpoints: Vec<String>,

    /// HTTP client
    client: reqwest::Client,

    /// Log each request
    debug: bool,
}

impl ExternalProbeResolver {
    /// Strategy name reported in [`ResolvedAddress`]
    pub const STRATEGY: &'static str = "external-probe";

    /// Create a resolver over the default endpoints
    pub fn new(options: &ClientOptions) -> Result<Self> {
        Self::with_endpoints(
            DEFAULT_ENDPOINTS.iter().map(|url| url.to_string()).collect(),
            options,
        )
    }

    /// Create a resolver over custom endpoints
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `endpoints` is empty or the HTTP client
    /// cannot be built.
    pub fn with_endpoints(endpoints: Vec<String>, options: &ClientOptions) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::config("external-probe needs at least one endpoint"));
        }

        let client = build_client(options)?;

        Ok(Self {
            endpoints,
            client,
            debug: options.debug,
        })
    }

    /// The configured endpoints
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    fn pick_endpoint(&self) -> Result<&str> {
        self.endpoints
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .ok_or_else(|| Error::config("external-probe needs at least one endpoint"))
    }

    async fn probe(&self, url: &str, timeout: Duration) -> Result<Ipv4Addr> {
        let source = endpoint_host(url);
        tracing::info!("Checking against: {}", source);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("GET {}", source), timeout)
                } else {
                    Error::upstream(source.clone(), format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if self.debug {
            tracing::info!("GET {} -> {}", url, status);
        } else {
            tracing::debug!("GET {} -> {}", url, status);
        }

        if !status.is_success() {
            return Err(Error::upstream(
                source,
                format!("External service returned status: {}", status.as_u16()),
            ));
        }

        let body: EchoResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(source.clone(), format!("Failed to decode response: {}", e)))?;

        parse_ipv4(&source, &body.ip)
    }
}

#[async_trait::async_trait]
impl IpResolver for ExternalProbeResolver {
    async fn resolve(&self, timeout: Duration) -> Result<ResolvedAddress> {
        let url = self.pick_endpoint()?;
        let ip = self.probe(url, timeout).await?;
        Ok(ResolvedAddress::new(ip, Self::STRATEGY))
    }

    fn strategy(&self) -> &'static str {
        Self::STRATEGY
    }
}

/// HTTP client bound to an IPv4 local address
///
/// Dual-stack echo services answer with whichever family the request used,
/// so probes must leave over IPv4 to be echoed an A-record address.
fn build_client(options: &ClientOptions) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        .timeout(options.timeout)
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Host part of an endpoint URL, for logs and error sources
fn endpoint_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Parse an echoed address, accepting IPv4 only
fn parse_ipv4(source: &str, raw: &str) -> Result<Ipv4Addr> {
    let raw = raw.trim();
    match raw.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(Error::upstream(
            source,
            format!("Expected IPv4, got: {}", ip),
        )),
        Err(_) => Err(Error::upstream(
            source,
            format!("Invalid IP address: {:?}", raw),
        )),
    }
}

/// Factory for creating external probe resolvers
pub struct ExternalProbeFactory;

impl IpResolverFactory for ExternalProbeFactory {
    fn create(&self, _host: &HostConfig, options: &ClientOptions) -> Result<Box<dyn IpResolver>> {
        Ok(Box::new(ExternalProbeResolver::new(options)?))
    }
}

/// Register the external probe strategy with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_resolver_aliases(METHOD_TAGS, Box::new(ExternalProbeFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creation() {
        let factory = ExternalProbeFactory;
        let host = HostConfig::new("home", "external-probe");

        let resolver = factory.create(&host, &ClientOptions::default());
        assert!(resolver.is_ok());
        assert_eq!(resolver.unwrap().strategy(), "external-probe");
    }

    #[test]
    fn test_register_both_tags() {
        let registry = ProviderRegistry::new();
        register(&registry);

        assert!(registry.has_resolver("external-probe"));
        assert!(registry.has_resolver("external"));
    }

    #[test]
    fn default_endpoints_are_all_candidates() {
        let resolver = ExternalProbeResolver::new(&ClientOptions::default()).unwrap();
        assert!(resolver.endpoints().len() >= 3);

        for _ in 0..20 {
            let pick = resolver.pick_endpoint().unwrap();
            assert!(DEFAULT_ENDPOINTS.contains(&pick));
        }
    }

    #[test]
    fn client_builds_with_ipv4_local_address() {
        let options = ClientOptions {
            debug: true,
            ..ClientOptions::default()
        };
        assert!(build_client(&options).is_ok());
    }

    #[test]
    fn empty_endpoint_list_is_rejected() {
        let result = ExternalProbeResolver::with_endpoints(Vec::new(), &ClientOptions::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn parse_trims_and_requires_ipv4() {
        assert_eq!(
            parse_ipv4("test", " 203.0.113.7\n").unwrap(),
            Ipv4Addr::new(203, 0, 113, 7)
        );
        assert!(parse_ipv4("test", "2001:db8::1").unwrap_err().is_upstream());
        assert!(parse_ipv4("test", "not an ip").unwrap_err().is_upstream());
    }

    #[test]
    fn endpoint_host_strips_path_and_query() {
        assert_eq!(endpoint_host("https://api.ipify.org?format=json"), "api.ipify.org");
        assert_eq!(endpoint_host("not a url"), "not a url");
    }
}
