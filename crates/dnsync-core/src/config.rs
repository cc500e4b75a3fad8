//! Configuration types for the dnsync system
//!
//! The configuration document is a YAML mapping of domain name to
//! [`DomainConfig`]. It is loaded once per process and never mutated; derived
//! values (effective timeout, default countries) are computed by accessors.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Where the daemon looks for the configuration document by default
pub const DEFAULT_CONFIG_PATH: &str = "/app/config/config.yml";

/// Per-call timeout used when a domain configures none (or less than 1s)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Allowed countries used when a domain configures none
pub const DEFAULT_ALLOWED_COUNTRIES: &[&str] = &["US", "CA"];

/// The full configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncConfig {
    /// Domain name → policy, iterated in name order
    pub domains: BTreeMap<String, DomainConfig>,
}

impl SyncConfig {
    /// Read and parse the configuration document at `path`
    ///
    /// Any failure here is fatal for the process.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_yaml(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration document from YAML text
    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Validate the document as a whole
    ///
    /// Per-domain problems are not fatal; they are reported when the domain is
    /// processed.
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(Error::config("No domains configured"));
        }

        for name in self.domains.keys() {
            if name.trim().is_empty() {
                return Err(Error::config("Domain name cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Policy for one domain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Dry-run: compute and report decisions without mutating records
    #[serde(default)]
    pub test: bool,

    /// Log every provider/cloud HTTP request at info level
    #[serde(default)]
    pub debug: bool,

    /// Per-call timeout in seconds; values below 1 mean the default
    #[serde(default)]
    pub timeout: i64,

    /// Delay between subdomain operations in seconds
    #[serde(default)]
    pub delay: u64,

    /// Allowed requester countries; empty means [`DEFAULT_ALLOWED_COUNTRIES`]
    #[serde(default)]
    pub allowed_countries: Vec<String>,

    /// Hosts whose subdomains are managed in this domain
    #[serde(default)]
    pub hosts: Vec<HostConfig>,

    /// NS1 credentials
    #[serde(default)]
    pub ns1: Option<Ns1Config>,
}

impl DomainConfig {
    /// Effective per-call timeout
    pub fn timeout(&self) -> Duration {
        match u64::try_from(self.timeout) {
            Ok(secs) if secs >= 1 => Duration::from_secs(secs),
            _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Delay inserted after every subdomain
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    /// Effective allowed-country list
    pub fn allowed_countries(&self) -> Vec<String> {
        if self.allowed_countries.is_empty() {
            DEFAULT_ALLOWED_COUNTRIES
                .iter()
                .map(|c| c.to_string())
                .collect()
        } else {
            self.allowed_countries.clone()
        }
    }

    /// Options handed to every client built for this domain
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.timeout(),
            debug: self.debug,
        }
    }

    /// The DNS provider this domain is hosted on
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        match &self.ns1 {
            Some(ns1) => {
                let provider = ProviderConfig::Ns1 {
                    api_key: ns1.api_key.clone(),
                };
                provider.validate()?;
                Ok(provider)
            }
            None => Err(Error::config("No DNS provider configured (expected `ns1`)")),
        }
    }
}

/// Timeout and debug settings shared by all clients of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Log every request
    pub debug: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: false,
        }
    }
}

/// NS1 section of a domain
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Ns1Config {
    /// NS1 API key
    #[serde(rename = "api-key", alias = "api_key", default)]
    pub api_key: String,
}

impl fmt::Debug for Ns1Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ns1Config")
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// NS1 managed DNS
    Ns1 {
        /// NS1 API key
        api_key: String,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ProviderConfig::Ns1 { api_key } => {
                if api_key.trim().is_empty() {
                    return Err(Error::config("NS1 API key cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Ns1 { .. } => "ns1",
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Ns1 { .. } => f
                .debug_struct("Ns1")
                .field("api_key", &"<REDACTED>")
                .finish(),
        }
    }
}

/// One host and the subdomains that point at it
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host name, for logs
    pub name: String,

    /// Resolution method tag, e.g. `cloud-instance` or `external-probe`
    pub method: String,

    /// Cloud API key (cloud-instance only)
    #[serde(
        rename = "API_KEY",
        alias = "api_key",
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<String>,

    /// Cloud instance ID (cloud-instance only)
    #[serde(
        rename = "HOST_KEY",
        alias = "host_key",
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_key: Option<String>,

    /// Subdomain labels in processing order; `@` is the apex
    #[serde(default)]
    pub subdomains: Vec<String>,
}

impl HostConfig {
    /// Create a host with the given method and subdomains
    pub fn new(name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    /// Set cloud credentials
    pub fn with_cloud_credentials(
        mut self,
        api_key: impl Into<String>,
        host_key: impl Into<String>,
    ) -> Self {
        self.api_key = Some(api_key.into());
        self.host_key = Some(host_key.into());
        self
    }

    /// Set the subdomain labels
    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("host_key", &self.host_key)
            .field("subdomains", &self.subdomains)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(i64),
}

// Instance IDs are often written unquoted in YAML.
fn de_opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}
