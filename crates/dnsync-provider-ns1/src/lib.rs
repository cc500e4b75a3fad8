// # NS1 DNS Provider
//
// This crate provides the NS1 managed DNS provider for dnsync.
//
// ## Implementation Status
//
// - ✅ One HTTP request per trait call
// - ✅ Full error propagation to the engine (it isolates failures per subdomain)
// - ✅ HTTP timeout configured from the domain's `timeout`
// - ✅ Specific error handling for HTTP status codes (401, 403, 404, 409, 429, 5xx)
// - ✅ Record 404 reported as `NotFound`, kept apart from transport failures
// - ✅ Answer metadata (`up`, `country`) passed through untouched
// - ❌ NO dry-run logic (owned by the executor)
// - ❌ NO retry or backoff logic
// - ❌ NO caching (every run re-reads provider state)
//
// ### Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTPS API calls to the NS1 endpoint only
// - ✅ Parse NS1 responses into engine records
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Decide whether a record needs changing
// - ❌ Access other providers
//
// ## Security Requirements
//
// - API key NEVER appears in logs
// - Provider MUST fail fast if the key is empty
//
// ## API Reference
//
// - Zone: GET `/zones/:zone`
// - Record: GET `/zones/:zone/:domain/:type`
// - Create record: PUT `/zones/:zone/:domain/:type`
// - Update record: POST `/zones/:zone/:domain/:type`

use async_trait::async_trait;
use dnsync_core::config::{ClientOptions, ProviderConfig};
use dnsync_core::record::{Answer, AnswerMeta, DnsRecord, Zone};
use dnsync_core::traits::{DnsProvider, DnsProviderFactory};
use dnsync_core::{Error, ProviderRegistry, Result};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// NS1 API base URL
pub const NS1_API_BASE: &str = "https://api.nsone.net/v1";

/// Header carrying the API key
const API_KEY_HEADER: &str = "X-NSONE-Key";

/// Provider name used in errors and logs
const PROVIDER: &str = "ns1";

/// Zone body; only the name is used
#[derive(Debug, Deserialize)]
struct WireZone {
    zone: String,
}

/// Record body as NS1 sends and accepts it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    zone: String,
    domain: String,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    answers: Vec<WireAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WireAnswer {
    #[serde(default)]
    answer: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<AnswerMeta>,
}

impl From<WireRecord> for DnsRecord {
    fn from(wire: WireRecord) -> Self {
        DnsRecord {
            id: wire.id,
            zone: wire.zone,
            domain: wire.domain,
            record_type: wire.record_type,
            answers: wire
                .answers
                .into_iter()
                .map(|a| Answer {
                    rdata: a.answer,
                    meta: a.meta,
                })
                .collect(),
        }
    }
}

impl From<&DnsRecord> for WireRecord {
    fn from(record: &DnsRecord) -> Self {
        WireRecord {
            id: record.id.clone(),
            zone: record.zone.clone(),
            domain: record.domain.clone(),
            record_type: record.record_type.clone(),
            answers: record
                .answers
                .iter()
                .map(|a| WireAnswer {
                    answer: a.rdata.clone(),
                    meta: a.meta.clone(),
                })
                .collect(),
        }
    }
}

/// NS1 DNS provider
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot: each trait call is exactly one API request.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct Ns1Provider {
    /// NS1 API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Per-request timeout
    timeout: Duration,

    /// Log every request and its status
    debug: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for Ns1Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ns1Provider")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Ns1Provider {
    /// Create a new NS1 provider
    ///
    /// # Parameters
    ///
    /// - `api_key`: NS1 API key with record read/write permission
    /// - `options`: Timeout and debug settings of the owning domain
    ///
    /// # Errors
    ///
    /// `Error::Config` if the key is empty or the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, options: &ClientOptions) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("NS1 API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: NS1_API_BASE.to_string(),
            client,
            timeout: options.timeout,
            debug: options.debug,
        })
    }

    /// Point the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn record_url(&self, zone: &str, domain: &str, record_type: &str) -> String {
        format!("{}/zones/{}/{}/{}", self.base_url, zone, domain, record_type)
    }

    /// Issue one request and map non-2xx statuses to errors
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&WireRecord>,
        what: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(what, self.timeout)
            } else {
                Error::upstream(PROVIDER, format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        if self.debug {
            tracing::info!("NS1 {} {} -> {}", method, url, status);
        } else {
            tracing::debug!("NS1 {} {} -> {}", method, url, status);
        }

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(status_error(status, what, &error_text))
    }
}

/// Map an NS1 error status to an engine error
fn status_error(status: StatusCode, what: &str, error_text: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API key or insufficient permissions. Status: {}",
            what, status
        )),
        404 => Error::not_found(format!("{}: {}", what, error_text)),
        409 => Error::upstream(
            PROVIDER,
            format!("{}: conflict, record changed concurrently. Status: {}", what, status),
        ),
        429 => Error::rate_limited(format!("{}: NS1 rate limit exceeded. Status: {}", what, status)),
        500..=599 => Error::upstream(
            PROVIDER,
            format!("{}: NS1 server error (transient): {} - {}", what, status, error_text),
        ),
        _ => Error::upstream(PROVIDER, format!("{} failed: {} - {}", what, status, error_text)),
    }
}

#[async_trait]
impl DnsProvider for Ns1Provider {
    /// Look up a zone
    ///
    /// ```http
    /// GET /zones/example.com
    /// X-NSONE-Key: <key>
    /// ```
    async fn get_zone(&self, domain: &str) -> Result<Zone> {
        let url = format!("{}/zones/{}", self.base_url, domain);
        let what = format!("get zone {}", domain);

        let response = self.send(Method::GET, &url, None, &what).await?;
        let zone: WireZone = response
            .json()
            .await
            .map_err(|e| Error::upstream(PROVIDER, format!("Failed to parse zone: {}", e)))?;

        Ok(Zone { name: zone.zone })
    }

    /// Fetch one record
    ///
    /// A 404 is `Error::NotFound`; every other failure is not.
    async fn get_record(&self, zone: &str, domain: &str, record_type: &str) -> Result<DnsRecord> {
        let url = self.record_url(zone, domain, record_type);
        let what = format!("get record {} ({})", domain, record_type);

        let response = self.send(Method::GET, &url, None, &what).await?;
        let record: WireRecord = response
            .json()
            .await
            .map_err(|e| Error::upstream(PROVIDER, format!("Failed to parse record: {}", e)))?;

        Ok(record.into())
    }

    /// Create a record
    ///
    /// ```http
    /// PUT /zones/example.com/www.example.com/A
    /// {"zone": "...", "domain": "...", "type": "A", "answers": [...]}
    /// ```
    async fn create_record(&self, record: &DnsRecord) -> Result<()> {
        let url = self.record_url(&record.zone, &record.domain, &record.record_type);
        let what = format!("create record {}", record.domain);

        self.send(Method::PUT, &url, Some(&WireRecord::from(record)), &what)
            .await?;
        Ok(())
    }

    /// Update a record, replacing its answers
    ///
    /// ```http
    /// POST /zones/example.com/www.example.com/A
    /// ```
    async fn update_record(&self, record: &DnsRecord) -> Result<()> {
        let url = self.record_url(&record.zone, &record.domain, &record.record_type);
        let what = format!("update record {}", record.domain);

        self.send(Method::POST, &url, Some(&WireRecord::from(record)), &what)
            .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating NS1 providers
pub struct Ns1Factory {
    base_url: String,
}

impl Ns1Factory {
    /// Factory whose providers talk to `base_url` instead of the public API
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for Ns1Factory {
    fn default() -> Self {
        Self::with_base_url(NS1_API_BASE)
    }
}

impl DnsProviderFactory for Ns1Factory {
    fn create(&self, config: &ProviderConfig, options: &ClientOptions) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Ns1 { api_key } => {
                let provider = Ns1Provider::new(api_key.clone(), options)?
                    .with_base_url(self.base_url.clone());
                Ok(Box::new(provider))
            }
        }
    }
}

/// Register the NS1 provider with a registry
///
/// # Example
///
/// ```rust
/// use dnsync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dnsync_provider_ns1::register(&registry);
/// assert!(registry.has_provider("ns1"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(Ns1Factory::default()));
}
