//! Core traits for the dnsync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Resolve a host's current public IPv4 address
//! - [`DnsProvider`]: Read and write DNS records via provider APIs
//! - [`CloudHostClient`]: Look up cloud instances for the `cloud-instance` strategy

pub mod cloud_host;
pub mod dns_provider;
pub mod ip_resolver;

pub use cloud_host::{CloudHostClient, Instance};
pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use ip_resolver::{IpResolver, IpResolverFactory, ResolvedAddress};
