use serde::{Deserialize, Serialize};

/// Canonical handle of a service found by listing the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveredResource {
    /// Full resource name, `projects/<p>/locations/<r>/services/<name>`.
    pub name: String,
    pub short_name: String,
    pub access_uri: String,
    pub region: String,
}

impl DiscoveredResource {
    pub fn from_name(name: impl Into<String>, access_uri: impl Into<String>) -> Self {
        let name = name.into();
        let short_name = short_name(&name).to_string();
        let region = location_of(&name).unwrap_or_default().to_string();
        Self {
            name,
            short_name,
            access_uri: access_uri.into(),
            region,
        }
    }
}

/// Last path segment of a resource name.
pub fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn location_of(name: &str) -> Option<&str> {
    let mut parts = name.split('/');
    while let Some(p) = parts.next() {
        if p == "locations" {
            return parts.next();
        }
    }
    None
}
