//! Health checks against discovered services.

use netcap_models::{DiscoveredResource, ProbeResult};
use reqwest::Client;
use std::convert::Infallible;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::EngineResult;
use crate::executor::BoundedExecutor;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub concurrency: usize,
    /// Whole-request budget, body included.
    pub timeout: Duration,
    /// Response bytes kept in the snippet.
    pub body_limit: usize,
    pub path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(10),
            body_limit: 1024,
            path: "/ping".to_string(),
        }
    }
}

/// Probes each service once with `GET <uri><path>`; only a 200 passes.
pub struct Prober {
    client: Client,
    config: ProbeConfig,
    executor: BoundedExecutor,
}

impl Prober {
    pub fn new(config: ProbeConfig) -> EngineResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let executor = BoundedExecutor::new(config.concurrency)?;
        Ok(Self {
            client,
            config,
            executor,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(token);
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// One result per resource, in input order. Emits a `ping_result`
    /// event per result.
    pub async fn probe_all(
        &self,
        resources: &[DiscoveredResource],
    ) -> Vec<ProbeResult> {
        let outcomes = self
            .executor
            .run(resources.to_vec(), |resource| {
                let client = self.client.clone();
                let path = self.config.path.clone();
                let body_limit = self.config.body_limit;
                async move {
                    Ok::<_, Infallible>(
                        probe(&client, &resource, &path, body_limit).await,
                    )
                }
            })
            .await;

        resources
            .iter()
            .zip(outcomes)
            .map(|(resource, outcome)| {
                let result = outcome.unwrap_or_else(|e| {
                    ProbeResult::transport_error(
                        resource.short_name.clone(),
                        ping_url(&resource.access_uri, &self.config.path),
                        e.to_string(),
                    )
                });
                emit(&result);
                result
            })
            .collect()
    }
}

fn ping_url(access_uri: &str, path: &str) -> String {
    format!("{}{}", access_uri.trim_end_matches('/'), path)
}

async fn probe(
    client: &Client,
    resource: &DiscoveredResource,
    path: &str,
    body_limit: usize,
) -> ProbeResult {
    let name = resource.short_name.clone();
    let url = ping_url(&resource.access_uri, path);
    if resource.access_uri.is_empty() {
        return ProbeResult::transport_error(name, url, "service has no URI");
    }

    let mut response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => return ProbeResult::transport_error(name, url, e.to_string()),
    };
    let status = response.status().as_u16();

    let mut body = Vec::new();
    let mut read_error = None;
    while body.len() < body_limit {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                read_error = Some(e.to_string());
                break;
            }
        }
    }
    body.truncate(body_limit);

    ProbeResult {
        resource_name: name,
        endpoint_url: url,
        status_code: Some(status),
        body_snippet: String::from_utf8_lossy(&body).into_owned(),
        pass: status == 200 && read_error.is_none(),
        error: read_error,
    }
}

fn emit(result: &ProbeResult) {
    let status = result.status_code.map(i64::from).unwrap_or(0);
    let error = result.error.as_deref().unwrap_or("");
    if result.pass {
        info!(
            event = "ping_result",
            service = %result.resource_name,
            url = %result.endpoint_url,
            status_code = status,
            body = %result.body_snippet,
            pass = result.pass
        );
    } else {
        error!(
            event = "ping_result",
            service = %result.resource_name,
            url = %result.endpoint_url,
            status_code = status,
            body = %result.body_snippet,
            pass = result.pass,
            error = %error
        );
    }
}
