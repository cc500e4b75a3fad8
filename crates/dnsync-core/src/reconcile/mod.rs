//! Record reconciler
//!
//! Pure decision logic: given the current IP, the desired countries and the
//! record the provider holds (if any), decide the minimal mutation.
//!
//! ```text
//! existing record?
//!   no  ──────────────────────────────▶ Create([ip], up, desired)
//!   yes ─▶ ip matches? metadata ok? ─┬▶ NoOp
//!                                    └▶ Update([ip], up, effective)
//! ```

pub mod metadata;

pub use metadata::{MetadataDiff, diff};

use crate::record::{Answer, DnsRecord};
use std::net::Ipv4Addr;
use tracing::debug;

/// The mutation required for one subdomain
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The record is already correct
    NoOp {
        /// Fully-qualified name
        domain: String,
        /// The IP the record already carries
        ip: Ipv4Addr,
    },

    /// No record exists; create one
    Create {
        /// Zone to create the record in
        zone: String,
        /// Fully-qualified name
        domain: String,
        /// The single answer to write
        answer: Answer,
    },

    /// A record exists but is stale
    Update {
        /// The record as fetched from the provider
        record: DnsRecord,
        /// The single answer that replaces all existing answers
        answer: Answer,
    },
}

impl Decision {
    /// The fully-qualified name this decision targets
    pub fn domain(&self) -> &str {
        match self {
            Decision::NoOp { domain, .. } | Decision::Create { domain, .. } => domain,
            Decision::Update { record, .. } => &record.domain,
        }
    }

    /// Whether applying this decision requires a mutating call
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Decision::NoOp { .. })
    }
}

/// Decide what to do with one subdomain
///
/// # Parameters
///
/// - `zone`: Zone the record lives in
/// - `domain`: Fully-qualified name
/// - `current_ip`: The host's resolved address
/// - `desired_countries`: The domain's effective allowed countries
/// - `existing`: The provider's record, `None` when the provider reported it absent
pub fn reconcile(
    zone: &str,
    domain: &str,
    current_ip: Ipv4Addr,
    desired_countries: &[String],
    existing: Option<&DnsRecord>,
) -> Decision {
    let Some(record) = existing else {
        debug!("{} has no record, will create", domain);
        return Decision::Create {
            zone: zone.to_string(),
            domain: domain.to_string(),
            answer: Answer::available(current_ip, desired_countries),
        };
    };

    // Exact text match, so a padded or non-canonical rdata gets rewritten
    let ip_matches = record
        .first_rdata()
        .is_some_and(|rdata| rdata == current_ip.to_string());

    if !ip_matches {
        debug!(
            "{} answers {:?}, current IP is {}",
            domain,
            record.first_rdata(),
            current_ip
        );
    }

    let meta = record.first_answer().and_then(|answer| answer.meta.as_ref());
    let MetadataDiff {
        needs_update,
        effective_countries,
    } = diff(meta, desired_countries);

    if ip_matches && !needs_update {
        return Decision::NoOp {
            domain: domain.to_string(),
            ip: current_ip,
        };
    }

    // rdata is always rewritten, even for metadata-only changes
    Decision::Update {
        record: record.clone(),
        answer: Answer::available(current_ip, &effective_countries),
    }
}
