// # Cloud Instance Resolver
//
// Resolves a host's address by asking its cloud provider for the instance and
// taking the first IPv4 address in the instance's list.
//
// The provider API itself lives behind `CloudHostClient`, so this strategy can
// be exercised without network access.

use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::executor::with_timeout;
use crate::traits::{CloudHostClient, IpResolver, ResolvedAddress};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info};

/// `cloud-instance` resolution strategy
pub struct CloudInstanceResolver {
    /// Host name, for errors and logs
    host: String,

    /// Instance ID at the cloud provider
    instance_id: u64,

    /// Cloud API client
    client: Box<dyn CloudHostClient>,
}

impl CloudInstanceResolver {
    /// Strategy name reported in [`ResolvedAddress`]
    pub const STRATEGY: &'static str = "cloud-instance";

    /// Create a resolver for a known instance ID
    pub fn new(host: impl Into<String>, instance_id: u64, client: Box<dyn CloudHostClient>) -> Self {
        Self {
            host: host.into(),
            instance_id,
            client,
        }
    }

    /// Create a resolver from host configuration
    ///
    /// Fails with `Error::Config` when `HOST_KEY` is missing or not a
    /// positive integer.
    pub fn from_host(host: &HostConfig, client: Box<dyn CloudHostClient>) -> Result<Self> {
        let instance_id = parse_instance_id(host)?;
        Ok(Self::new(host.name.clone(), instance_id, client))
    }
}

/// Parse a host's `HOST_KEY` as a cloud instance ID
pub fn parse_instance_id(host: &HostConfig) -> Result<u64> {
    let raw = host
        .host_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| Error::config(format!("Host {} has no HOST_KEY", host.name)))?;

    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::config(format!(
            "Host {} has invalid HOST_KEY '{}': expected a positive instance ID",
            host.name, raw
        ))),
    }
}

#[async_trait]
impl IpResolver for CloudInstanceResolver {
    async fn resolve(&self, timeout: Duration) -> Result<ResolvedAddress> {
        info!(
            "Checking against: {} API (instance {})",
            self.client.provider_name(),
            self.instance_id
        );

        let instance = with_timeout(
            self.client.get_instance(self.instance_id),
            timeout,
            format!("get_instance {}", self.instance_id),
        )
        .await?;

        debug!(
            "Instance {} ({:?}) reports IPv4 {:?}",
            instance.id, instance.label, instance.ipv4
        );

        let first = instance
            .ipv4
            .first()
            .ok_or_else(|| Error::no_address(self.host.clone()))?;

        let ip: Ipv4Addr = first.trim().parse().map_err(|_| {
            Error::upstream(
                self.client.provider_name(),
                format!("instance {} reported invalid IPv4 '{}'", self.instance_id, first),
            )
        })?;

        Ok(ResolvedAddress::new(ip, Self::STRATEGY))
    }

    fn strategy(&self) -> &'static str {
        Self::STRATEGY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Instance;

    struct FixedCloud {
        result: std::result::Result<Vec<String>, &'static str>,
    }

    #[async_trait]
    impl CloudHostClient for FixedCloud {
        async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
            match &self.result {
                Ok(ipv4) => Ok(Instance {
                    id: instance_id,
                    label: None,
                    ipv4: ipv4.clone(),
                }),
                Err(msg) => Err(Error::upstream("fixed", *msg)),
            }
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn resolver(result: std::result::Result<Vec<String>, &'static str>) -> CloudInstanceResolver {
        CloudInstanceResolver::new("web-1", 42, Box::new(FixedCloud { result }))
    }

    #[tokio::test]
    async fn returns_first_ipv4() {
        let resolver = resolver(Ok(vec!["203.0.113.5".into(), "198.51.100.1".into()]));
        let resolved = resolver.resolve(Duration::from_secs(1)).await.unwrap();
        assert_eq!(resolved.ip, Ipv4Addr::new(203, 0, 113, 5));
        assert_eq!(resolved.strategy, "cloud-instance");
    }

    #[tokio::test]
    async fn empty_address_list_is_no_address() {
        let err = resolver(Ok(vec![]))
            .resolve(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoAddress(ref host) if host == "web-1"));
    }

    #[tokio::test]
    async fn api_failure_is_upstream() {
        let err = resolver(Err("boom"))
            .resolve(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn garbage_address_is_upstream() {
        let err = resolver(Ok(vec!["not-an-ip".into()]))
            .resolve(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn instance_id_must_be_positive_integer() {
        let host = HostConfig::new("web-1", "cloud-instance").with_cloud_credentials("k", "abc");
        assert!(matches!(parse_instance_id(&host), Err(Error::Config(_))));

        let host = HostConfig::new("web-1", "cloud-instance").with_cloud_credentials("k", "0");
        assert!(parse_instance_id(&host).is_err());

        let host = HostConfig::new("web-1", "cloud-instance");
        assert!(parse_instance_id(&host).is_err());

        let host = HostConfig::new("web-1", "cloud-instance").with_cloud_credentials("k", " 77 ");
        assert_eq!(parse_instance_id(&host).unwrap(), 77);
    }
}
