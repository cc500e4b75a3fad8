// # DNS Provider Trait
//
// Defines the interface to the DNS provider holding the managed zones.
//
// ## Implementations
//
// - NS1: `dnsync-provider-ns1` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::DnsProvider;
//
// let zone = provider.get_zone("example.com").await?;
// match provider.get_record(&zone.name, "home.example.com", "A").await {
//     Ok(record) => { /* reconcile against it */ }
//     Err(e) if e.is_not_found() => { /* create it */ }
//     Err(e) => return Err(e),
// }
// ```

use crate::config::{ClientOptions, ProviderConfig};
use crate::record::{DnsRecord, Zone};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// One provider value is built per configured domain and shared by all of
/// that domain's hosts and subdomains for the duration of a run.
///
/// # Trust Level: Untrusted
///
/// Providers only translate calls into API requests:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses into [`DnsRecord`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (the next scheduled run is the retry)
/// - ❌ Decide whether a record needs changing (owned by the reconciler)
/// - ❌ Honour dry-run themselves (owned by the executor)
/// - ❌ Log credentials
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the zone for a configured domain
    ///
    /// # Returns
    ///
    /// - `Ok(Zone)`: The zone handle
    /// - `Err(Error::NotFound)`: The provider has no such zone
    /// - `Err(Error)`: Transport/API failure
    async fn get_zone(&self, domain: &str) -> Result<Zone, crate::Error>;

    /// Fetch the existing record for a fully-qualified name
    ///
    /// Implementations MUST return `Error::NotFound` only when the provider
    /// positively reports the record as absent. Transport failures must be
    /// reported as another variant so they are never mistaken for a missing
    /// record.
    async fn get_record(
        &self,
        zone: &str,
        domain: &str,
        record_type: &str,
    ) -> Result<DnsRecord, crate::Error>;

    /// Create a new record
    async fn create_record(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Replace an existing record's answers
    async fn update_record(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance for one domain
    ///
    /// # Parameters
    ///
    /// - `config`: Provider credentials from the domain's configuration
    /// - `options`: Timeout and debug settings of the domain
    fn create(
        &self,
        config: &ProviderConfig,
        options: &ClientOptions,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
