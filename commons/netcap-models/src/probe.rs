use serde::{Deserialize, Serialize};

/// Point-in-time connectivity check of one discovered service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    #[serde(rename = "service")]
    pub resource_name: String,
    #[serde(rename = "url")]
    pub endpoint_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(rename = "body")]
    pub body_snippet: String,
    pub pass: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn transport_error(
        resource_name: impl Into<String>,
        endpoint_url: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            resource_name: resource_name.into(),
            endpoint_url: endpoint_url.into(),
            status_code: None,
            body_snippet: String::new(),
            pass: false,
            error: Some(error.into()),
        }
    }
}
