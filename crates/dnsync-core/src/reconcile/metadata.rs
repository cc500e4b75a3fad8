//! Metadata differ
//!
//! Compares an existing answer's metadata with the desired country policy.
//! The three checks are evaluated independently; any one of them forces an
//! update. When the only problem is that the answer is marked down, the
//! operator's existing country list is kept instead of the domain default.

use crate::record::{AnswerMeta, same_countries};
use tracing::{debug, warn};

/// Result of comparing existing metadata with the desired policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDiff {
    /// Whether the answer must be rewritten
    pub needs_update: bool,
    /// Country list to write if it is
    pub effective_countries: Vec<String>,
}

/// Compare `existing` metadata against the `desired` country list
pub fn diff(existing: Option<&AnswerMeta>, desired: &[String]) -> MetadataDiff {
    let Some(meta) = existing else {
        debug!("answer has no metadata");
        return MetadataDiff {
            needs_update: true,
            effective_countries: desired.to_vec(),
        };
    };

    let mut needs_update = false;
    let mut effective_countries = desired.to_vec();

    let existing_countries = match meta.countries() {
        Ok(countries) => Some(countries),
        Err(reason) => {
            warn!("Malformed country metadata ({}), using desired list", reason);
            needs_update = true;
            None
        }
    };

    if let Some(countries) = &existing_countries
        && !same_countries(countries, desired)
    {
        debug!(
            "allowed countries differ: {:?} -> {:?}",
            countries, desired
        );
        needs_update = true;
    }

    if !meta.is_up() {
        debug!("answer is not marked up: {:?}", meta.up);
        needs_update = true;
        if let Some(countries) = existing_countries {
            effective_countries = countries;
        }
    }

    MetadataDiff {
        needs_update,
        effective_countries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn countries(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    fn meta(up: serde_json::Value, country: serde_json::Value) -> AnswerMeta {
        AnswerMeta {
            up: Some(up),
            country: Some(country),
        }
    }

    #[test]
    fn absent_metadata_forces_desired() {
        let desired = countries(&["US", "CA"]);
        let result = diff(None, &desired);
        assert!(result.needs_update);
        assert_eq!(result.effective_countries, desired);
    }

    #[test]
    fn matching_metadata_needs_nothing() {
        let desired = countries(&["US", "CA"]);
        let existing = meta(json!(true), json!(["CA", "US"]));
        let result = diff(Some(&existing), &desired);
        assert!(!result.needs_update);
    }

    #[test]
    fn differing_countries_use_desired() {
        let desired = countries(&["US", "CA"]);
        let existing = meta(json!(true), json!(["DE"]));
        let result = diff(Some(&existing), &desired);
        assert!(result.needs_update);
        assert_eq!(result.effective_countries, desired);
    }

    #[test]
    fn down_answer_keeps_existing_countries() {
        let desired = countries(&["US", "CA"]);
        let existing = meta(json!(false), json!(["DE", "FR"]));
        let result = diff(Some(&existing), &desired);
        assert!(result.needs_update);
        assert_eq!(result.effective_countries, countries(&["DE", "FR"]));
    }

    #[test]
    fn down_answer_with_matching_countries_still_updates() {
        let desired = countries(&["US", "CA"]);
        let existing = meta(json!(false), json!(["US", "CA"]));
        let result = diff(Some(&existing), &desired);
        assert!(result.needs_update);
        assert_eq!(result.effective_countries, desired);
    }

    #[test]
    fn non_boolean_up_counts_as_down() {
        let desired = countries(&["US"]);
        let existing = meta(json!({"feed": "abc"}), json!(["US"]));
        assert!(diff(Some(&existing), &desired).needs_update);
    }

    #[test]
    fn malformed_countries_force_desired() {
        let desired = countries(&["US", "CA"]);
        let existing = meta(json!(true), json!("US,CA"));
        let result = diff(Some(&existing), &desired);
        assert!(result.needs_update);
        assert_eq!(result.effective_countries, desired);
    }

    #[test]
    fn malformed_countries_on_down_answer_use_desired() {
        let desired = countries(&["US", "CA"]);
        let existing = meta(json!(false), json!([1, 2]));
        let result = diff(Some(&existing), &desired);
        assert!(result.needs_update);
        assert_eq!(result.effective_countries, desired);
    }
}
