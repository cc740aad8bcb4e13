use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{TokenSource, send_json};
use crate::error::ControlResult;
use crate::traits::LogReader;
use crate::types::LogEntry;

pub const DEFAULT_LOGGING_ENDPOINT: &str = "https://logging.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesRequest<'a> {
    resource_names: Vec<String>,
    filter: &'a str,
    order_by: &'static str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesResponse {
    #[serde(default)]
    entries: Vec<LogEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Cloud Logging `entries:list` reader.
pub struct RestLogReader {
    client: Client,
    endpoint: String,
    token: Arc<TokenSource>,
}

impl RestLogReader {
    pub fn new(
        endpoint: impl Into<String>,
        token: TokenSource,
    ) -> ControlResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("netcap/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: Arc::new(token),
        })
    }
}

#[async_trait]
impl LogReader for RestLogReader {
    async fn read_entries(
        &self,
        project: &str,
        filter: &str,
    ) -> ControlResult<Vec<LogEntry>> {
        let url = format!(
            "{}/v2/entries:list",
            self.endpoint.trim_end_matches('/')
        );
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let body = ListEntriesRequest {
                resource_names: vec![format!("projects/{}", project)],
                filter,
                order_by: "timestamp asc",
                page_size: 1000,
                page_token: page_token.take(),
            };
            let request = self.client.post(&url).json(&body);
            let page: ListEntriesResponse =
                send_json(&self.token, request).await?;
            entries.extend(page.entries);
            match page.next_page_token {
                Some(t) if !t.is_empty() => page_token = Some(t),
                _ => break,
            }
        }
        Ok(entries)
    }
}
