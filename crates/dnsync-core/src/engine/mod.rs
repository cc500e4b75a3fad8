//! Orchestration loop
//!
//! The SyncEngine walks the configuration once per run:
//!
//! ```text
//! for domain:                      provider client + zone lookup
//!   for host:                      resolve IP once
//!     for subdomain:               fetch record → reconcile → apply → sleep(delay)
//! ```
//!
//! ## Failure Isolation
//!
//! - Provider construction or zone lookup failure skips the domain
//! - Unknown method or IP resolution failure skips the host
//! - Record read/write failure skips the subdomain
//!
//! Nothing below the configuration load aborts a run.
//!
//! ## Sequencing
//!
//! Everything is awaited in order; no tasks are spawned. The inter-subdomain
//! delay keeps the run under the provider's rate limit, which concurrent calls
//! would defeat.

use crate::config::{DomainConfig, HostConfig, SyncConfig};
use crate::error::Result;
use crate::executor::{self, ApplyOutcome, with_timeout};
use crate::reconcile::reconcile;
use crate::record::{DnsRecord, RECORD_TYPE_A, fqdn};
use crate::registry::ProviderRegistry;
use crate::traits::{DnsProvider, ResolvedAddress};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Default capacity of the engine event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A run started
    RunStarted { domains: usize },

    /// A domain was skipped (provider construction or zone lookup failed)
    DomainSkipped { domain: String, error: String },

    /// A host was skipped (unknown method or IP resolution failed)
    HostSkipped {
        domain: String,
        host: String,
        error: String,
    },

    /// A host's IP was resolved
    HostResolved {
        domain: String,
        host: String,
        address: ResolvedAddress,
    },

    /// A subdomain decision was applied (or simulated)
    SubdomainApplied { zone: String, outcome: ApplyOutcome },

    /// Reading or writing a subdomain's record failed
    SubdomainFailed {
        zone: String,
        domain: String,
        ip: Ipv4Addr,
        error: String,
    },

    /// A run finished
    RunCompleted { report: RunReport },
}

/// Per-run tally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub unchanged: usize,
    pub created: usize,
    pub updated: usize,
    pub would_create: usize,
    pub would_update: usize,
    pub failed_subdomains: usize,
    pub skipped_hosts: usize,
    pub skipped_domains: usize,
}

impl RunReport {
    fn record(&mut self, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::Unchanged { .. } => self.unchanged += 1,
            ApplyOutcome::Created { .. } => self.created += 1,
            ApplyOutcome::Updated { .. } => self.updated += 1,
            ApplyOutcome::WouldCreate { .. } => self.would_create += 1,
            ApplyOutcome::WouldUpdate { .. } => self.would_update += 1,
        }
    }

    /// Whether anything failed or was skipped during the run
    pub fn has_failures(&self) -> bool {
        self.failed_subdomains > 0 || self.skipped_hosts > 0 || self.skipped_domains > 0
    }
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`] from a loaded [`SyncConfig`]
/// 2. Call [`SyncEngine::run_once()`] per scheduled run
/// 3. Optionally drain the event receiver for monitoring
pub struct SyncEngine {
    /// Loaded configuration, read-only for the engine's lifetime
    config: SyncConfig,

    /// Factories for providers and resolvers
    registry: Arc<ProviderRegistry>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        config: SyncConfig,
        registry: Arc<ProviderRegistry>,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        // Room for a whole run, so draining between runs never drops events
        let capacity = DEFAULT_EVENT_CHANNEL_CAPACITY.max(events_per_run(&config));
        Self::with_event_capacity(config, registry, capacity)
    }

    /// Create a new engine with a custom event channel capacity
    pub fn with_event_capacity(
        config: SyncConfig,
        registry: Arc<ProviderRegistry>,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(capacity.max(1));

        let engine = Self {
            config,
            registry,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Reconcile every configured domain once
    pub async fn run_once(&self) -> RunReport {
        let mut report = RunReport::default();

        self.emit_event(EngineEvent::RunStarted {
            domains: self.config.domains.len(),
        });

        for (domain, policy) in &self.config.domains {
            self.process_domain(domain, policy, &mut report).await;
        }

        info!(
            "DNS update completed: {} unchanged, {} created, {} updated, {} would-create, {} would-update, {} failed",
            report.unchanged,
            report.created,
            report.updated,
            report.would_create,
            report.would_update,
            report.failed_subdomains
        );

        self.emit_event(EngineEvent::RunCompleted {
            report: report.clone(),
        });

        report
    }

    /// Build the domain's provider client and reconcile it
    async fn process_domain(&self, domain: &str, policy: &DomainConfig, report: &mut RunReport) {
        info!("Processing domain: {}", domain);

        let provider = match policy
            .provider_config()
            .and_then(|config| self.registry.create_provider(&config, &policy.client_options()))
        {
            Ok(provider) => provider,
            Err(e) => {
                error!("Failed to set up DNS provider for {}: {}", domain, e);
                self.skip_domain(domain, e.to_string(), report);
                return;
            }
        };

        self.sync_domain(domain, policy, provider.as_ref(), report)
            .await;
    }

    /// Reconcile one domain against an already-built provider
    ///
    /// The provider is owned by the caller and shared by all hosts of the
    /// domain.
    pub async fn sync_domain(
        &self,
        domain: &str,
        policy: &DomainConfig,
        provider: &dyn DnsProvider,
        report: &mut RunReport,
    ) {
        if policy.test {
            warn!("Domain {} is in TEST mode - no changes will be made", domain);
        }

        let timeout = policy.timeout();
        let countries = policy.allowed_countries();

        let zone = match with_timeout(
            provider.get_zone(domain),
            timeout,
            format!("get_zone {domain}"),
        )
        .await
        {
            Ok(zone) => zone,
            Err(e) => {
                error!("Failed to load zone {}: {}", domain, e);
                self.skip_domain(domain, e.to_string(), report);
                return;
            }
        };

        info!("Zone: {} (provider: {})", zone.name, provider.provider_name());

        for host in &policy.hosts {
            self.sync_host(domain, &zone.name, host, policy, provider, &countries, report)
                .await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn sync_host(
        &self,
        domain: &str,
        zone: &str,
        host: &HostConfig,
        policy: &DomainConfig,
        provider: &dyn DnsProvider,
        countries: &[String],
        report: &mut RunReport,
    ) {
        info!("Checking subdomains for host: {}", host.name);

        let address = match self.resolve_host(host, policy).await {
            Ok(address) => address,
            Err(e) => {
                error!("Failed to get IP for host {}: {}", host.name, e);
                report.skipped_hosts += 1;
                self.emit_event(EngineEvent::HostSkipped {
                    domain: domain.to_string(),
                    host: host.name.clone(),
                    error: e.to_string(),
                });
                return;
            }
        };

        info!("Host {} resolved to {}", host.name, address);
        self.emit_event(EngineEvent::HostResolved {
            domain: domain.to_string(),
            host: host.name.clone(),
            address,
        });

        let delay = policy.delay();
        for label in &host.subdomains {
            let name = fqdn(domain, label);

            match self
                .sync_subdomain(zone, &name, address.ip, countries, policy, provider)
                .await
            {
                Ok(outcome) => {
                    report.record(&outcome);
                    self.emit_event(EngineEvent::SubdomainApplied {
                        zone: zone.to_string(),
                        outcome,
                    });
                }
                Err(e) => {
                    error!(
                        "Failed to reconcile {} (zone {}, IP {}): {}",
                        name, zone, address.ip, e
                    );
                    report.failed_subdomains += 1;
                    self.emit_event(EngineEvent::SubdomainFailed {
                        zone: zone.to_string(),
                        domain: name.clone(),
                        ip: address.ip,
                        error: e.to_string(),
                    });
                }
            }

            // Spread provider calls out to stay under its rate limit
            if !delay.is_zero() {
                debug!("Sleeping {:?} before next subdomain", delay);
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn resolve_host(&self, host: &HostConfig, policy: &DomainConfig) -> Result<ResolvedAddress> {
        let resolver = self
            .registry
            .create_resolver(host, &policy.client_options())?;
        let timeout = policy.timeout();

        with_timeout(
            resolver.resolve(timeout),
            timeout,
            format!("resolve {} via {}", host.name, resolver.strategy()),
        )
        .await
    }

    async fn sync_subdomain(
        &self,
        zone: &str,
        name: &str,
        ip: Ipv4Addr,
        countries: &[String],
        policy: &DomainConfig,
        provider: &dyn DnsProvider,
    ) -> Result<ApplyOutcome> {
        let timeout = policy.timeout();
        let existing = fetch_existing(provider, zone, name, timeout).await?;
        let decision = reconcile(zone, name, ip, countries, existing.as_ref());

        debug!("Decision for {}: {:?}", name, decision);

        executor::apply(provider, decision, policy.test, timeout).await
    }

    fn skip_domain(&self, domain: &str, error: String, report: &mut RunReport) {
        report.skipped_domains += 1;
        self.emit_event(EngineEvent::DomainSkipped {
            domain: domain.to_string(),
            error,
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Never block a run on a slow consumer
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider draining events faster.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Upper bound on the events a single run emits
fn events_per_run(config: &SyncConfig) -> usize {
    let per_domain: usize = config
        .domains
        .values()
        .map(|policy| {
            1 + policy
                .hosts
                .iter()
                .map(|host| 1 + host.subdomains.len())
                .sum::<usize>()
        })
        .sum();

    // RunStarted and RunCompleted
    per_domain + 2
}

/// Fetch the record for `name`, mapping a positive not-found to `None`
///
/// Transport failures are returned as errors and never treated as absence.
async fn fetch_existing(
    provider: &dyn DnsProvider,
    zone: &str,
    name: &str,
    timeout: Duration,
) -> Result<Option<DnsRecord>> {
    match with_timeout(
        provider.get_record(zone, name, RECORD_TYPE_A),
        timeout,
        format!("get_record {name}"),
    )
    .await
    {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_not_found() => {
            debug!("No existing record for {}", name);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
