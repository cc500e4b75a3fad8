// # Cloud Host Client Trait
//
// Boundary to the cloud provider that owns `cloud-instance` hosts.
//
// ## Implementations
//
// - Linode API v4: `dnsync-ip-linode` crate

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The part of a cloud instance the engine cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Provider instance ID
    pub id: u64,
    /// Human label, if the provider reports one
    #[serde(default)]
    pub label: Option<String>,
    /// IPv4 addresses in provider order
    #[serde(default)]
    pub ipv4: Vec<String>,
}

/// Trait for cloud host API clients
#[async_trait]
pub trait CloudHostClient: Send + Sync {
    /// Fetch one instance by ID
    async fn get_instance(&self, instance_id: u64) -> Result<Instance, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
