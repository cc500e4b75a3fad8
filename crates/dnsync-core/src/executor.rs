//! Update executor
//!
//! Applies a [`Decision`] against a [`DnsProvider`]. In dry-run mode no
//! mutating call is made and the outcome says what *would* have happened, so
//! callers can tell a simulated run from a real one.

use crate::error::{Error, Result};
use crate::reconcile::Decision;
use crate::record::{Answer, DnsRecord};
use crate::traits::DnsProvider;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::info;

/// Result of applying one decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Record already correct, nothing sent
    Unchanged { domain: String, ip: Ipv4Addr },
    /// Record created at the provider
    Created { domain: String, ip: Ipv4Addr },
    /// Record updated at the provider
    Updated { domain: String, ip: Ipv4Addr },
    /// Dry-run: the record would have been created
    WouldCreate { domain: String, ip: Ipv4Addr },
    /// Dry-run: the record would have been updated
    WouldUpdate { domain: String, ip: Ipv4Addr },
}

impl ApplyOutcome {
    /// Whether the outcome is a simulated mutation
    pub fn is_dry_run(&self) -> bool {
        matches!(
            self,
            ApplyOutcome::WouldCreate { .. } | ApplyOutcome::WouldUpdate { .. }
        )
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::Unchanged { domain, ip } => write!(f, "{domain} unchanged ({ip})"),
            ApplyOutcome::Created { domain, ip } => write!(f, "created {domain} -> {ip}"),
            ApplyOutcome::Updated { domain, ip } => write!(f, "updated {domain} -> {ip}"),
            ApplyOutcome::WouldCreate { domain, ip } => {
                write!(f, "[DRY-RUN] would create {domain} -> {ip}")
            }
            ApplyOutcome::WouldUpdate { domain, ip } => {
                write!(f, "[DRY-RUN] would update {domain} -> {ip}")
            }
        }
    }
}

/// Apply a decision
///
/// # Parameters
///
/// - `provider`: The domain's DNS provider
/// - `decision`: Output of [`crate::reconcile::reconcile`]
/// - `dry_run`: Suppress all mutating calls
/// - `timeout`: Upper bound for the provider call
///
/// # Returns
///
/// - `Ok(ApplyOutcome)`: What was (or would have been) done
/// - `Err(Error)`: The provider call failed; the caller isolates it to this subdomain
pub async fn apply(
    provider: &dyn DnsProvider,
    decision: Decision,
    dry_run: bool,
    timeout: Duration,
) -> Result<ApplyOutcome> {
    match decision {
        Decision::NoOp { domain, ip } => {
            info!("{} already points at {}, nothing to do", domain, ip);
            Ok(ApplyOutcome::Unchanged { domain, ip })
        }

        Decision::Create {
            zone,
            domain,
            answer,
        } => {
            let ip = answer_ip(&domain, &answer)?;

            if dry_run {
                info!("[DRY-RUN] Would create record {} with IP {}", domain, ip);
                return Ok(ApplyOutcome::WouldCreate { domain, ip });
            }

            let record = DnsRecord::new_a(zone, domain.as_str(), answer);
            with_timeout(
                provider.create_record(&record),
                timeout,
                format!("create_record {domain}"),
            )
            .await?;

            info!("Created new record {} with IP {}", domain, ip);
            Ok(ApplyOutcome::Created { domain, ip })
        }

        Decision::Update { mut record, answer } => {
            let domain = record.domain.clone();
            let ip = answer_ip(&domain, &answer)?;

            if dry_run {
                info!("[DRY-RUN] Would update record {} to IP {}", domain, ip);
                return Ok(ApplyOutcome::WouldUpdate { domain, ip });
            }

            record.answers = vec![answer];
            with_timeout(
                provider.update_record(&record),
                timeout,
                format!("update_record {domain}"),
            )
            .await?;

            info!("Updated record {} to IP {}", domain, ip);
            Ok(ApplyOutcome::Updated { domain, ip })
        }
    }
}

/// Bound a provider future by `timeout`
pub(crate) async fn with_timeout<T, F>(future: F, timeout: Duration, operation: String) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(operation, timeout)),
    }
}

// The reconciler always builds `[ip]`; reject anything else before writing it.
fn answer_ip(domain: &str, answer: &Answer) -> Result<Ipv4Addr> {
    answer.ipv4().ok_or_else(|| {
        Error::Other(format!(
            "refusing to write {domain}: answer has no IPv4 rdata ({:?})",
            answer.rdata
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_display_marks_dry_run() {
        let outcome = ApplyOutcome::WouldCreate {
            domain: "home.example.com".into(),
            ip: Ipv4Addr::new(203, 0, 113, 5),
        };
        assert!(outcome.is_dry_run());
        assert_eq!(
            outcome.to_string(),
            "[DRY-RUN] would create home.example.com -> 203.0.113.5"
        );
    }

    #[test]
    fn answer_ip_rejects_empty_rdata() {
        let answer = Answer {
            rdata: vec![],
            meta: None,
        };
        assert!(answer_ip("home.example.com", &answer).is_err());
    }
}
