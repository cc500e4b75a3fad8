// # dnsync-core
//
// Reconciliation engine that keeps geo-routed DNS "A" records in sync with
// the public IPv4 addresses of the hosts that own them.
//
// ## Architecture Overview
//
// - **IpResolver**: Trait for resolving a host's current public IPv4 address
// - **DnsProvider**: Trait for reading and writing DNS records via provider APIs
// - **CloudHostClient**: Trait for cloud instance lookups (`cloud-instance` strategy)
// - **reconcile**: Pure decision logic (metadata differ + record reconciler)
// - **executor**: Applies decisions, honouring dry-run
// - **SyncEngine**: Orchestrates domains → hosts → subdomains
// - **ProviderRegistry**: Plugin-based registry for providers and resolvers
//
// ## Design Principles
//
// 1. **Stateless runs**: Every run re-derives the desired state from the provider
// 2. **Pure decisions**: Reconciliation never touches the network
// 3. **Plugin-Based**: Strategies and providers are registered, never hard-coded
// 4. **Failure isolation**: A failure only skips the subdomain, host or domain it belongs to

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod resolve;
pub mod traits;

// Re-export core types for convenience
pub use config::{ClientOptions, DomainConfig, HostConfig, ProviderConfig, SyncConfig};
pub use engine::{EngineEvent, RunReport, SyncEngine};
pub use error::{Error, Result};
pub use executor::{ApplyOutcome, apply};
pub use reconcile::{Decision, MetadataDiff, diff, reconcile};
pub use record::{Answer, AnswerMeta, DnsRecord, Zone};
pub use registry::ProviderRegistry;
pub use resolve::CloudInstanceResolver;
pub use traits::{CloudHostClient, DnsProvider, IpResolver, ResolvedAddress};
