use serde::{Deserialize, Serialize};

use crate::error::{ControlPlaneError, ControlResult};

/// `projects/<project>/locations/<region>`
pub fn parent(project: &str, region: &str) -> String {
    format!("projects/{}/locations/{}", project, region)
}

pub fn job_name(parent: &str, job_id: &str) -> String {
    format!("{}/jobs/{}", parent, job_id)
}

pub fn service_name(parent: &str, service_id: &str) -> String {
    format!("{}/services/{}", parent, service_id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Handle of a long-running control-plane action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl Operation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            error: None,
            response: None,
        }
    }

    /// Terminal result of a finished operation, `None` while still running.
    pub fn outcome(&self) -> Option<ControlResult<OperationOutput>> {
        if !self.done {
            return None;
        }
        Some(match &self.error {
            Some(status) => Err(ControlPlaneError::OperationFailed {
                name: self.name.clone(),
                code: status.code,
                message: status.message.clone(),
            }),
            None => Ok(OperationOutput {
                name: self.name.clone(),
                response: self.response.clone().unwrap_or_default(),
            }),
        })
    }
}

/// Response payload of a successfully completed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutput {
    pub name: String,
    pub response: serde_json::Value,
}

impl OperationOutput {
    pub fn into_execution(self) -> ControlResult<Execution> {
        Ok(serde_json::from_value(self.response)?)
    }
}

/// Raw service descriptor as produced by listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(default)]
    pub uri: String,
}

/// Terminal state of one job execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub name: String,
    #[serde(default)]
    pub succeeded_count: u32,
    #[serde(default)]
    pub failed_count: u32,
    #[serde(default)]
    pub cancelled_count: u32,
}

impl Execution {
    pub fn short_name(&self) -> &str {
        netcap_models::short_name(&self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl LogEntry {
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            text_payload: Some(payload.into()),
            ..Default::default()
        }
    }

    /// Payload rendered as one output line.
    pub fn payload_line(&self) -> String {
        match (&self.text_payload, &self.json_payload) {
            (Some(text), _) => text.clone(),
            (None, Some(json)) => json.to_string(),
            (None, None) => String::new(),
        }
    }
}
