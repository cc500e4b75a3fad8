// # IP Resolver Trait
//
// Defines the single capability every IP resolution strategy provides:
// produce the current public IPv4 address of one host.
//
// ## Implementations
//
// - `cloud-instance`: [`crate::resolve::CloudInstanceResolver`] backed by a
//   [`CloudHostClient`](crate::traits::CloudHostClient) (`dnsync-ip-linode`)
// - `external-probe`: `dnsync-ip-http` crate
//
// New strategies are added by implementing [`IpResolver`] and registering an
// [`IpResolverFactory`] under a method tag with the
// [`ProviderRegistry`](crate::ProviderRegistry).

use crate::config::{ClientOptions, HostConfig};
use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// A host's current public address and the strategy that produced it
///
/// Recomputed every run, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// The resolved IPv4 address
    pub ip: Ipv4Addr,
    /// Name of the strategy that produced it (e.g. "cloud-instance")
    pub strategy: &'static str,
}

impl ResolvedAddress {
    /// Create a new resolved address
    pub fn new(ip: Ipv4Addr, strategy: &'static str) -> Self {
        Self { ip, strategy }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (via {})", self.ip, self.strategy)
    }
}

/// Trait for IP resolution strategies
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ One bounded network request per `resolve()` call
///
/// ## Forbidden Capabilities
/// - ❌ Caching results between calls
/// - ❌ Retrying (one successful response is authoritative, one failure is final)
/// - ❌ Touching DNS records
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the host's current IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(ResolvedAddress)`: The current address
    /// - `Err(Error::NoAddress)`: The host exists but has no IPv4 address
    /// - `Err(Error)`: Upstream/transport failure or timeout
    async fn resolve(&self, timeout: Duration) -> Result<ResolvedAddress, crate::Error>;

    /// The strategy name, used in logs and in [`ResolvedAddress::strategy`]
    fn strategy(&self) -> &'static str;
}

/// Helper trait for constructing resolvers from host configuration
pub trait IpResolverFactory: Send + Sync {
    /// Create a resolver for one host
    ///
    /// Fails with `Error::Config` when the host's credentials are unusable.
    fn create(
        &self,
        host: &HostConfig,
        options: &ClientOptions,
    ) -> Result<Box<dyn IpResolver>, crate::Error>;
}
