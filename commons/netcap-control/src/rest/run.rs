use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use netcap_models::{CHECKER_TASK_TIMEOUT, JobSpec, ServiceSpec};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::{TokenSource, send_json};
use crate::error::{ControlPlaneError, ControlResult};
use crate::traits::{ControlPlane, ServiceStream};
use crate::types::{Operation, OperationOutput, ServiceDescriptor};

pub const DEFAULT_RUN_ENDPOINT: &str = "https://run.googleapis.com";

/// Slack on top of the checker task budget for scheduling and cold start.
const OPERATION_DEADLINE_MARGIN: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub endpoint: String,
    /// Per-request timeout; must exceed `wait_timeout`.
    pub request_timeout: Duration,
    /// Server-side blocking window of one `:wait` call.
    pub wait_timeout: Duration,
    /// Upper bound on the total time spent waiting for one operation. Must
    /// outlast `CHECKER_TASK_TIMEOUT`.
    pub operation_deadline: Duration,
    pub page_size: u32,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RUN_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(90),
            wait_timeout: Duration::from_secs(60),
            operation_deadline: CHECKER_TASK_TIMEOUT + OPERATION_DEADLINE_MARGIN,
            page_size: 100,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListServicesPage {
    #[serde(default)]
    services: Vec<ServiceDescriptor>,
    #[serde(default)]
    next_page_token: Option<String>,
}

enum Page {
    First,
    Next(String),
    Done,
}

/// Cloud Run Admin API v2 over HTTPS.
pub struct RestControlPlane {
    client: Client,
    config: RestConfig,
    token: Arc<TokenSource>,
}

impl RestControlPlane {
    pub fn new(config: RestConfig, token: TokenSource) -> ControlResult<Self> {
        if !(config.endpoint.starts_with("http://")
            || config.endpoint.starts_with("https://"))
        {
            return Err(ControlPlaneError::Configuration(
                "API endpoint must start with http:// or https://".into(),
            ));
        }
        let client = Client::builder()
            .user_agent(concat!("netcap/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            token: Arc::new(token),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn list_page(
        &self,
        parent: &str,
        page_token: Option<&str>,
    ) -> ControlResult<ListServicesPage> {
        let mut query = vec![("pageSize", self.config.page_size.to_string())];
        if let Some(t) = page_token {
            query.push(("pageToken", t.to_string()));
        }
        let request = self
            .client
            .get(self.url(&format!("{}/services", parent)))
            .query(&query);
        send_json(&self.token, request).await
    }
}

#[async_trait]
impl ControlPlane for RestControlPlane {
    async fn create_service(
        &self,
        parent: &str,
        service_id: &str,
        spec: &ServiceSpec,
    ) -> ControlResult<Operation> {
        let request = self
            .client
            .post(self.url(&format!("{}/services", parent)))
            .query(&[("serviceId", service_id)])
            .json(spec);
        send_json(&self.token, request).await
    }

    async fn delete_service(&self, name: &str) -> ControlResult<Operation> {
        send_json(&self.token, self.client.delete(self.url(name))).await
    }

    fn list_services<'a>(&'a self, parent: &'a str) -> ServiceStream<'a> {
        stream::try_unfold(Page::First, move |page| async move {
            let token = match page {
                Page::Done => return Ok(None),
                Page::First => None,
                Page::Next(t) => Some(t),
            };
            let body = self.list_page(parent, token.as_deref()).await?;
            let next = match body.next_page_token {
                Some(t) if !t.is_empty() => Page::Next(t),
                _ => Page::Done,
            };
            debug!(parent = %parent, count = body.services.len(), "Listed services page");
            let items = body.services.into_iter().map(Ok::<_, ControlPlaneError>);
            Ok::<_, ControlPlaneError>(Some((stream::iter(items), next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn wait_operation(
        &self,
        operation: &Operation,
    ) -> ControlResult<OperationOutput> {
        if let Some(outcome) = operation.outcome() {
            return outcome;
        }
        let deadline = Instant::now() + self.config.operation_deadline;
        let body = serde_json::json!({
            "timeout": format!("{}s", self.config.wait_timeout.as_secs()),
        });
        loop {
            let request = self
                .client
                .post(self.url(&format!("{}:wait", operation.name)))
                .json(&body);
            let current: Operation = send_json(&self.token, request).await?;
            if let Some(outcome) = current.outcome() {
                return outcome;
            }
            if Instant::now() >= deadline {
                return Err(ControlPlaneError::OperationTimeout(
                    operation.name.clone(),
                ));
            }
        }
    }

    async fn create_job(
        &self,
        parent: &str,
        job_id: &str,
        spec: &JobSpec,
    ) -> ControlResult<Operation> {
        let request = self
            .client
            .post(self.url(&format!("{}/jobs", parent)))
            .query(&[("jobId", job_id)])
            .json(spec);
        send_json(&self.token, request).await
    }

    async fn update_job(
        &self,
        name: &str,
        spec: &JobSpec,
    ) -> ControlResult<Operation> {
        let mut job = spec.clone();
        job.name = Some(name.to_string());
        let request = self.client.patch(self.url(name)).json(&job);
        send_json(&self.token, request).await
    }

    async fn delete_job(&self, name: &str) -> ControlResult<Operation> {
        send_json(&self.token, self.client.delete(self.url(name))).await
    }

    async fn run_job(&self, name: &str) -> ControlResult<Operation> {
        let request = self
            .client
            .post(self.url(&format!("{}:run", name)))
            .json(&serde_json::json!({}));
        send_json(&self.token, request).await
    }
}
