// # Linode Cloud Host Client
//
// This crate provides the Linode API v4 client behind the `cloud-instance`
// resolution strategy, and registers that strategy with dnsync.
//
// ## Implementation Status
//
// - ✅ One HTTP request per lookup
// - ✅ Bearer token auth, token never logged
// - ✅ Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - ❌ NO pagination (single instance lookups only)
// - ❌ NO retry logic
//
// ## Trust Level
//
// ✅ Trusted for:
// - The addresses Linode assigned to the instance
//
// ❌ NOT trusted for:
// - Whether the instance is actually reachable on that address
//
// ## API Reference
//
// - Get instance: GET `/linode/instances/:id`

use async_trait::async_trait;
use dnsync_core::config::{ClientOptions, HostConfig};
use dnsync_core::traits::{CloudHostClient, Instance, IpResolver, IpResolverFactory};
use dnsync_core::{CloudInstanceResolver, Error, ProviderRegistry, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// Linode API base URL
pub const LINODE_API_BASE: &str = "https://api.linode.com/v4";

/// Method tags this strategy is registered under
pub const METHOD_TAGS: &[&str] = &["cloud-instance", "LinodeAPI"];

/// Provider name used in errors and logs
const PROVIDER: &str = "linode";

/// Linode API v4 client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct LinodeClient {
    /// Personal access token with Linodes:read scope
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    /// Per-request timeout
    timeout: Duration,

    /// Log every request and its status
    debug: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for LinodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinodeClient")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LinodeClient {
    /// Create a new Linode client
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be
    /// built.
    pub fn new(api_token: impl Into<String>, options: &ClientOptions) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Linode API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: LINODE_API_BASE.to_string(),
            client,
            timeout: options.timeout,
            debug: options.debug,
        })
    }

    /// Point the client at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl CloudHostClient for LinodeClient {
    /// Fetch one instance
    ///
    /// ```http
    /// GET /linode/instances/123
    /// Authorization: Bearer <token>
    /// ```
    async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
        let url = format!("{}/linode/instances/{}", self.base_url, instance_id);
        let what = format!("get instance {}", instance_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(what.as_str(), self.timeout)
                } else {
                    Error::upstream(PROVIDER, format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if self.debug {
            tracing::info!("Linode GET {} -> {}", url, status);
        } else {
            tracing::debug!("Linode GET {} -> {}", url, status);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &what, &error_text));
        }

        response
            .json::<Instance>()
            .await
            .map_err(|e| Error::upstream(PROVIDER, format!("Failed to parse instance: {}", e)))
    }

    fn provider_name(&self) -> &'static str {
        "Linode"
    }
}

/// Map a Linode error status to an engine error
///
/// Every failure here is an upstream failure from the engine's point of view;
/// an unknown instance ID is not a "record absent" signal.
fn status_error(status: StatusCode, what: &str, error_text: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid Linode token or missing Linodes:read scope. Status: {}",
            what, status
        )),
        404 => Error::upstream(PROVIDER, format!("{}: instance not found", what)),
        429 => Error::rate_limited(format!("{}: Linode rate limit exceeded. Status: {}", what, status)),
        500..=599 => Error::upstream(
            PROVIDER,
            format!("{}: Linode server error (transient): {} - {}", what, status, error_text),
        ),
        _ => Error::upstream(PROVIDER, format!("{} failed: {} - {}", what, status, error_text)),
    }
}

/// Factory building `cloud-instance` resolvers backed by Linode
pub struct LinodeFactory {
    base_url: String,
}

impl LinodeFactory {
    /// Factory whose clients talk to `base_url` instead of the public API
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for LinodeFactory {
    fn default() -> Self {
        Self::with_base_url(LINODE_API_BASE)
    }
}

impl IpResolverFactory for LinodeFactory {
    fn create(&self, host: &HostConfig, options: &ClientOptions) -> Result<Box<dyn IpResolver>> {
        let token = host
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config(format!("Host {} has no API_KEY", host.name)))?;

        let client = LinodeClient::new(token, options)
            .map_err(|e| Error::config(format!("Host {}: {}", host.name, e)))?
            .with_base_url(self.base_url.clone());

        Ok(Box::new(CloudInstanceResolver::from_host(
            host,
            Box::new(client),
        )?))
    }
}

/// Register the Linode-backed `cloud-instance` strategy with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_resolver_aliases(METHOD_TAGS, Box::new(LinodeFactory::default()));
}
