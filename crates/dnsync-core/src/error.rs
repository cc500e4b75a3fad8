//! Error types for the dnsync engine
//!
//! Errors are classified by how far their damage spreads: configuration
//! problems skip the host or domain they belong to, upstream failures skip the
//! subdomain, host or domain being processed, and `NotFound` on a record
//! lookup is the signal to create a record rather than a failure.

use thiserror::Error;

/// Result type alias for dnsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dnsync system
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unknown configuration (resolution method, credentials, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any third-party API or transport failure
    #[error("Upstream error ({source_name}): {message}")]
    Upstream {
        /// Which upstream failed (e.g. "ns1", "linode", "ipify.org")
        source_name: String,
        /// Error message
        message: String,
    },

    /// A cloud instance exists but carries no IPv4 address
    #[error("No IPv4 address found for host {0}")]
    NoAddress(String),

    /// Zone or record does not exist at the provider
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials rejected by an upstream API
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Upstream API rate limit hit
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A call exceeded the per-domain timeout
    #[error("Timed out after {timeout_secs}s: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The configured timeout
        timeout_secs: u64,
    },

    /// YAML parse errors from the configuration document
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an upstream error attributed to `source_name`
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a "no address" error for a host
    pub fn no_address(host: impl Into<String>) -> Self {
        Self::NoAddress(host.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs: timeout.as_secs(),
        }
    }

    /// Whether this error means "the thing does not exist" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error is an upstream/transport class failure
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. }
                | Self::Authentication(_)
                | Self::RateLimited(_)
                | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn not_found_is_not_upstream() {
        let err = Error::not_found("home.example.com");
        assert!(err.is_not_found());
        assert!(!err.is_upstream());
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = Error::timeout("get_record home.example.com", Duration::from_secs(30));
        assert!(err.is_upstream());
        assert_eq!(
            err.to_string(),
            "Timed out after 30s: get_record home.example.com"
        );
    }
}
