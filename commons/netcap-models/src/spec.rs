//! Resource specifications submitted to the control plane.
//!
//! Field names follow the Cloud Run Admin API v2 JSON representation so the
//! same values can be sent over the wire without a translation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";
pub const TARGET_URL_ENV: &str = "TARGET_URL";

/// Wall-clock budget of one checker task.
pub const CHECKER_TASK_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Ingress {
    #[serde(rename = "INGRESS_TRAFFIC_ALL")]
    All,
    #[serde(rename = "INGRESS_TRAFFIC_INTERNAL_ONLY")]
    InternalOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VpcEgress {
    #[serde(rename = "ALL_TRAFFIC")]
    AllTraffic,
    #[serde(rename = "PRIVATE_RANGES_ONLY")]
    PrivateRangesOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[validate(length(min = 1, message = "Network cannot be empty"))]
    pub network: String,
    #[validate(length(min = 1, message = "Subnetwork cannot be empty"))]
    pub subnetwork: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VpcAccess {
    pub egress: VpcEgress,
    #[validate(length(min = 1), nested)]
    pub network_interfaces: Vec<NetworkInterface>,
}

impl VpcAccess {
    pub fn all_traffic(network: &str, subnetwork: &str) -> Self {
        Self {
            egress: VpcEgress::AllTraffic,
            network_interfaces: vec![NetworkInterface {
                network: network.to_string(),
                subnetwork: subnetwork.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Scaling {
    #[validate(range(min = 1, message = "At least one instance must stay active"))]
    pub min_instance_count: u32,
    pub max_instance_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceRequirements {
    pub limits: BTreeMap<String, String>,
}

impl ResourceRequirements {
    pub fn cpu_memory(cpu: &str, memory: &str) -> Self {
        let mut limits = BTreeMap::new();
        limits.insert("cpu".to_string(), cpu.to_string());
        limits.insert("memory".to_string(), memory.to_string());
        Self { limits }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[validate(length(min = 1, message = "Container image cannot be empty"))]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub resources: ResourceRequirements,
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

impl Container {
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    fn set_env(&mut self, name: &str, value: &str) {
        match self.env.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.value = value.to_string(),
            None => self.env.push(EnvVar::new(name, value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RevisionTemplate {
    #[validate(nested)]
    pub vpc_access: VpcAccess,
    #[validate(nested)]
    pub scaling: Scaling,
    #[validate(length(min = 1), nested)]
    pub containers: Vec<Container>,
}

/// Immutable parameters of one provisioned service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub ingress: Ingress,
    #[validate(nested)]
    pub template: RevisionTemplate,
}

impl ServiceSpec {
    /// Internal-only, single always-on instance with a minimal footprint.
    pub fn internal_probe_service(
        image: &str,
        network: &str,
        subnetwork: &str,
        target_url: &str,
    ) -> Self {
        Self {
            ingress: Ingress::InternalOnly,
            template: RevisionTemplate {
                vpc_access: VpcAccess::all_traffic(network, subnetwork),
                scaling: Scaling {
                    min_instance_count: 1,
                    max_instance_count: 1,
                },
                containers: vec![Container {
                    image: image.to_string(),
                    ports: vec![ContainerPort {
                        container_port: 8080,
                    }],
                    resources: ResourceRequirements::cpu_memory("0.08", "128Mi"),
                    env: vec![EnvVar::new(TARGET_URL_ENV, target_url)],
                }],
            },
        }
    }

    /// Copy of this template with the service's own name injected.
    pub fn for_service(&self, service_name: &str) -> Self {
        let mut spec = self.clone();
        for c in spec.template.containers.iter_mut() {
            c.set_env(SERVICE_NAME_ENV, service_name);
        }
        spec
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub max_retries: u32,
    /// Protobuf duration string, e.g. `1800s`.
    pub timeout: String,
    #[validate(length(min = 1), nested)]
    pub containers: Vec<Container>,
    #[validate(nested)]
    pub vpc_access: VpcAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTemplate {
    pub task_count: u32,
    pub parallelism: u32,
    #[validate(nested)]
    pub template: TaskTemplate,
}

/// Batch job that runs the connectivity checker inside the subnet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(nested)]
    pub template: ExecutionTemplate,
}

impl JobSpec {
    pub fn checker(
        image: &str,
        network: &str,
        subnetwork: &str,
        env: Vec<EnvVar>,
    ) -> Self {
        Self {
            name: None,
            template: ExecutionTemplate {
                task_count: 1,
                parallelism: 1,
                template: TaskTemplate {
                    max_retries: 0,
                    timeout: format!("{}s", CHECKER_TASK_TIMEOUT.as_secs()),
                    containers: vec![Container {
                        image: image.to_string(),
                        ports: Vec::new(),
                        resources: ResourceRequirements::cpu_memory("1", "512Mi"),
                        env,
                    }],
                    vpc_access: VpcAccess::all_traffic(network, subnetwork),
                },
            },
        }
    }
}
