//! DNS record model shared by the engine and provider crates
//!
//! Metadata values are kept as raw JSON so that records written by other
//! tools (wrong types, missing keys) can still be read and corrected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// The only record type this engine manages
pub const RECORD_TYPE_A: &str = "A";

/// Label that designates the zone apex in host configuration
pub const APEX_LABEL: &str = "@";

/// Build the fully-qualified name for a subdomain label
///
/// `@` maps to the domain itself.
pub fn fqdn(domain: &str, label: &str) -> String {
    if label == APEX_LABEL {
        domain.to_string()
    } else {
        format!("{label}.{domain}")
    }
}

/// A provider's zone handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone name as the provider knows it (e.g. "example.com")
    pub name: String,
}

/// One fully-qualified name's record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned record ID, if the record exists remotely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Zone the record lives in
    pub zone: String,
    /// Fully-qualified domain name
    pub domain: String,
    /// Record type, always "A" when written by this engine
    pub record_type: String,
    /// Answers; the engine always writes exactly one
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl DnsRecord {
    /// Create a new, not-yet-persisted A record with a single answer
    pub fn new_a(zone: impl Into<String>, domain: impl Into<String>, answer: Answer) -> Self {
        Self {
            id: None,
            zone: zone.into(),
            domain: domain.into(),
            record_type: RECORD_TYPE_A.to_string(),
            answers: vec![answer],
        }
    }

    /// The first answer, if any
    pub fn first_answer(&self) -> Option<&Answer> {
        self.answers.first()
    }

    /// The first rdata value of the first answer, if any
    pub fn first_rdata(&self) -> Option<&str> {
        self.first_answer()
            .and_then(|answer| answer.rdata.first())
            .map(String::as_str)
    }
}

/// A record answer: the IP value plus routing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer data; for A records a single IPv4 literal
    #[serde(default)]
    pub rdata: Vec<String>,
    /// Geo-routing and availability metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<AnswerMeta>,
}

impl Answer {
    /// Build a fully-populated answer: `[ip]`, `up = true`, the given countries
    pub fn available(ip: Ipv4Addr, countries: &[String]) -> Self {
        Self {
            rdata: vec![ip.to_string()],
            meta: Some(AnswerMeta::available(countries)),
        }
    }

    /// The IPv4 address in this answer, if rdata holds one
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.rdata.first().and_then(|value| value.parse().ok())
    }
}

/// Answer metadata as stored at the provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnswerMeta {
    /// Availability flag; anything other than JSON `true` counts as down
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<Value>,
    /// Allowed requester countries; expected to be a list of strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Value>,
}

impl AnswerMeta {
    /// Metadata marking an answer up for the given countries
    pub fn available(countries: &[String]) -> Self {
        Self {
            up: Some(Value::Bool(true)),
            country: Some(Value::Array(
                countries.iter().cloned().map(Value::String).collect(),
            )),
        }
    }

    /// Whether the answer is marked up
    pub fn is_up(&self) -> bool {
        matches!(self.up, Some(Value::Bool(true)))
    }

    /// Parse the country list
    ///
    /// Returns an error message describing the problem when the value is
    /// missing or is not a list of strings.
    pub fn countries(&self) -> std::result::Result<Vec<String>, String> {
        let value = self
            .country
            .as_ref()
            .ok_or_else(|| "country metadata is missing".to_string())?;

        let items = value
            .as_array()
            .ok_or_else(|| format!("country metadata is not a list: {value}"))?;

        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("country at index {idx} is not a string: {item}"))
            })
            .collect()
    }
}

/// Order-insensitive country list comparison
pub fn same_countries(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}
