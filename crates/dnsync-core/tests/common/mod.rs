//! Test doubles and common utilities for engine contract tests
//!
//! The doubles share their state through `Arc`s so a test can hand one clone
//! to the registry and keep another to inspect afterwards.

#![allow(dead_code)]

use dnsync_core::config::{ClientOptions, DomainConfig, HostConfig, Ns1Config, ProviderConfig, SyncConfig};
use dnsync_core::error::{Error, Result};
use dnsync_core::record::{Answer, AnswerMeta, DnsRecord, RECORD_TYPE_A, Zone};
use dnsync_core::traits::{
    CloudHostClient, DnsProvider, DnsProviderFactory, Instance, IpResolver, IpResolverFactory,
};
use dnsync_core::{CloudInstanceResolver, EngineEvent, ProviderRegistry};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct ProviderState {
    records: Mutex<HashMap<String, DnsRecord>>,
    failing_zones: Mutex<HashSet<String>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    hanging_reads: Mutex<HashSet<String>>,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

/// An in-memory DnsProvider that tracks calls
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<ProviderState>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing record
    pub fn insert_record(&self, record: DnsRecord) {
        self.state
            .records
            .lock()
            .unwrap()
            .insert(record.domain.clone(), record);
    }

    /// The stored record for `domain`
    pub fn record(&self, domain: &str) -> Option<DnsRecord> {
        self.state.records.lock().unwrap().get(domain).cloned()
    }

    /// Make zone lookups for `domain` fail with a transport error
    pub fn fail_zone(&self, domain: &str) {
        self.state
            .failing_zones
            .lock()
            .unwrap()
            .insert(domain.to_string());
    }

    /// Make record reads for `domain` fail with a transport error
    pub fn fail_reads_for(&self, domain: &str) {
        self.state
            .failing_reads
            .lock()
            .unwrap()
            .insert(domain.to_string());
    }

    /// Make record writes for `domain` fail
    pub fn fail_writes_for(&self, domain: &str) {
        self.state
            .failing_writes
            .lock()
            .unwrap()
            .insert(domain.to_string());
    }

    /// Make record reads for `domain` never complete
    pub fn hang_reads_for(&self, domain: &str) {
        self.state
            .hanging_reads
            .lock()
            .unwrap()
            .insert(domain.to_string());
    }

    pub fn get_call_count(&self) -> usize {
        self.state.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.state.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.state.update_calls.load(Ordering::SeqCst)
    }

    /// Total number of mutating calls
    pub fn mutation_count(&self) -> usize {
        self.create_call_count() + self.update_call_count()
    }

    fn check_write(&self, domain: &str) -> Result<()> {
        if self.state.failing_writes.lock().unwrap().contains(domain) {
            return Err(Error::upstream("mock", format!("write rejected for {domain}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn get_zone(&self, domain: &str) -> Result<Zone> {
        if self.state.failing_zones.lock().unwrap().contains(domain) {
            return Err(Error::upstream("mock", "zone lookup: connection refused"));
        }
        Ok(Zone {
            name: domain.to_string(),
        })
    }

    async fn get_record(&self, _zone: &str, domain: &str, _record_type: &str) -> Result<DnsRecord> {
        self.state.get_calls.fetch_add(1, Ordering::SeqCst);

        if self.state.failing_reads.lock().unwrap().contains(domain) {
            return Err(Error::upstream("mock", "connection reset by peer"));
        }

        let hangs = self.state.hanging_reads.lock().unwrap().contains(domain);
        if hangs {
            std::future::pending::<()>().await;
        }

        self.record(domain)
            .ok_or_else(|| Error::not_found(format!("record not found: {domain}")))
    }

    async fn create_record(&self, record: &DnsRecord) -> Result<()> {
        self.state.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write(&record.domain)?;

        let mut stored = record.clone();
        stored.id = Some(format!("mock-{}", record.domain));
        self.insert_record(stored);
        Ok(())
    }

    async fn update_record(&self, record: &DnsRecord) -> Result<()> {
        self.state.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write(&record.domain)?;

        self.insert_record(record.clone());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Hands out clones of one MockDnsProvider
pub struct MockProviderFactory(pub MockDnsProvider);

impl DnsProviderFactory for MockProviderFactory {
    fn create(&self, _config: &ProviderConfig, _options: &ClientOptions) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(self.0.clone()))
    }
}

/// A cloud API with a fixed set of instances
#[derive(Clone, Default)]
pub struct MockCloud {
    instances: Arc<Mutex<HashMap<u64, Vec<String>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance with the given IPv4 list
    pub fn with_instance(self, id: u64, ipv4: &[&str]) -> Self {
        self.set_instance(id, ipv4);
        self
    }

    /// Replace an instance's IPv4 list
    pub fn set_instance(&self, id: u64, ipv4: &[&str]) {
        self.instances
            .lock()
            .unwrap()
            .insert(id, ipv4.iter().map(|ip| ip.to_string()).collect());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CloudHostClient for MockCloud {
    async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ipv4 = self
            .instances
            .lock()
            .unwrap()
            .get(&instance_id)
            .cloned()
            .ok_or_else(|| Error::upstream("mock-cloud", format!("instance {instance_id}: 404")))?;

        Ok(Instance {
            id: instance_id,
            label: None,
            ipv4,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock-cloud"
    }
}

/// Builds real CloudInstanceResolvers on top of a MockCloud
pub struct MockCloudFactory(pub MockCloud);

impl IpResolverFactory for MockCloudFactory {
    fn create(&self, host: &HostConfig, _options: &ClientOptions) -> Result<Box<dyn IpResolver>> {
        Ok(Box::new(CloudInstanceResolver::from_host(
            host,
            Box::new(self.0.clone()),
        )?))
    }
}

pub const ZONE: &str = "example.com";

/// Registry wired to the given doubles under the production names
pub fn registry_with(provider: &MockDnsProvider, cloud: &MockCloud) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    registry.register_provider("ns1", Box::new(MockProviderFactory(provider.clone())));
    registry.register_resolver_aliases(
        &["cloud-instance", "LinodeAPI"],
        Box::new(MockCloudFactory(cloud.clone())),
    );
    Arc::new(registry)
}

/// A cloud-instance host pointing at instance `id`
pub fn cloud_host(name: &str, id: u64, subdomains: &[&str]) -> HostConfig {
    HostConfig::new(name, "cloud-instance")
        .with_cloud_credentials("cloud-key", id.to_string())
        .with_subdomains(subdomains.iter().copied())
}

/// A domain policy with NS1 credentials, no delay and a short timeout
pub fn domain_policy(test: bool, countries: &[&str], hosts: Vec<HostConfig>) -> DomainConfig {
    DomainConfig {
        test,
        timeout: 5,
        delay: 0,
        allowed_countries: countries.iter().map(|c| c.to_string()).collect(),
        hosts,
        ns1: Some(Ns1Config {
            api_key: "test-key".to_string(),
        }),
        ..DomainConfig::default()
    }
}

/// Configuration with a single domain
pub fn single_domain(domain: &str, policy: DomainConfig) -> SyncConfig {
    let mut config = SyncConfig::default();
    config.domains.insert(domain.to_string(), policy);
    config
}

/// An existing A record with one answer
pub fn existing_record(domain: &str, ip: &str, up: bool, countries: &[&str]) -> DnsRecord {
    DnsRecord {
        id: Some(format!("existing-{domain}")),
        zone: ZONE.to_string(),
        domain: domain.to_string(),
        record_type: RECORD_TYPE_A.to_string(),
        answers: vec![Answer {
            rdata: vec![ip.to_string()],
            meta: Some(AnswerMeta {
                up: Some(json!(up)),
                country: Some(json!(countries)),
            }),
        }],
    }
}

/// Collect every event currently in the channel
pub fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Strings helper
pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
