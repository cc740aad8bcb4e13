use serde::{Deserialize, Serialize};

use crate::spec::ServiceSpec;

/// A logical service instance to be provisioned.
///
/// The id is derived from the run prefix and the ordinal and never changes
/// across retry rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    pub id: String,
    pub ordinal: u32,
    pub spec: ServiceSpec,
}

impl Target {
    pub fn new(prefix: &str, ordinal: u32, template: &ServiceSpec) -> Self {
        let id = target_id(prefix, ordinal);
        let spec = template.for_service(&id);
        Self { id, ordinal, spec }
    }
}

/// `<prefix>-<ordinal zero padded to three digits>`.
pub fn target_id(prefix: &str, ordinal: u32) -> String {
    format!("{}-{:03}", prefix, ordinal)
}

/// Returns true when `short_name` is exactly `<prefix>-<digits>`.
pub fn matches_target_pattern(prefix: &str, short_name: &str) -> bool {
    short_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .map(|digits| {
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_zero_padded() {
        assert_eq!(target_id("svc", 0), "svc-000");
        assert_eq!(target_id("svc", 42), "svc-042");
        assert_eq!(target_id("svc", 1234), "svc-1234");
    }

    #[test]
    fn pattern_requires_numeric_suffix() {
        assert!(matches_target_pattern("service", "service-007"));
        assert!(matches_target_pattern("service", "service-1000"));
        assert!(!matches_target_pattern("service", "service-"));
        assert!(!matches_target_pattern("service", "service-abc"));
        assert!(!matches_target_pattern("service", "service-01-x"));
        assert!(!matches_target_pattern("service", "services-001"));
        assert!(!matches_target_pattern("service", "other-001"));
    }
}
