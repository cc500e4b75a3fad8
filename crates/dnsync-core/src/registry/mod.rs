//! Plugin-based provider registry
//!
//! The registry maps resolution method tags and DNS provider names to
//! factories, so that adding a strategy means registering a factory rather
//! than editing a dispatch function.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnsync_core::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! dnsync_provider_ns1::register(&registry);
//! dnsync_ip_http::register(&registry);
//! dnsync_ip_linode::register(&registry);
//!
//! let resolver = registry.create_resolver(&host, &options)?;
//! let provider = registry.create_provider(&provider_config, &options)?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_resolver("external-probe", Box::new(ExternalProbeFactory));
//! }
//! ```

use crate::config::{ClientOptions, HostConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, IpResolver, IpResolverFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Provider registry for plugin-based resolver and DNS provider creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Arc<dyn DnsProviderFactory>>>,

    /// Registered IP resolver factories, keyed by method tag
    resolvers: RwLock<HashMap<String, Arc<dyn IpResolverFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "ns1")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name.into(), Arc::from(factory));
    }

    /// Register an IP resolver factory under a method tag
    ///
    /// # Parameters
    ///
    /// - `method`: Method tag as written in host configuration (e.g., "external-probe")
    /// - `factory`: Factory object for creating resolver instances
    pub fn register_resolver(&self, method: impl Into<String>, factory: Box<dyn IpResolverFactory>) {
        self.register_resolver_shared(method, Arc::from(factory));
    }

    /// Register one factory under several method tags (canonical name plus aliases)
    pub fn register_resolver_aliases(
        &self,
        methods: &[&str],
        factory: Box<dyn IpResolverFactory>,
    ) {
        let factory: Arc<dyn IpResolverFactory> = Arc::from(factory);
        for method in methods {
            self.register_resolver_shared(*method, Arc::clone(&factory));
        }
    }

    fn register_resolver_shared(&self, method: impl Into<String>, factory: Arc<dyn IpResolverFactory>) {
        let mut resolvers = self
            .resolvers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resolvers.insert(method.into(), factory);
    }

    /// Create a DNS provider for one domain
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error::Config)`: If the provider type is not registered or creation fails
    pub fn create_provider(
        &self,
        config: &ProviderConfig,
        options: &ClientOptions,
    ) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();
        let factory = {
            let providers = self
                .providers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            providers
                .get(provider_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?
        };

        factory.create(config, options)
    }

    /// Create the resolver for one host
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn IpResolver>)`: Created resolver
    /// - `Err(Error::Config)`: Unknown method tag or unusable credentials
    pub fn create_resolver(
        &self,
        host: &HostConfig,
        options: &ClientOptions,
    ) -> Result<Box<dyn IpResolver>> {
        let factory = {
            let resolvers = self
                .resolvers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            resolvers.get(host.method.as_str()).cloned().ok_or_else(|| {
                Error::config(format!(
                    "Unknown resolution method '{}' for host {}",
                    host.method, host.name
                ))
            })?
        };

        factory.create(host, options)
    }

    /// List all registered method tags
    pub fn list_resolvers(&self) -> Vec<String> {
        let resolvers = self
            .resolvers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resolvers.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.contains_key(name)
    }

    /// Check if a method tag is registered
    pub fn has_resolver(&self, method: &str) -> bool {
        let resolvers = self
            .resolvers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        resolvers.contains_key(method)
    }
}
