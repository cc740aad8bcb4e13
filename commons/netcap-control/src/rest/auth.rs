use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{ControlPlaneError, ControlResult};

pub const METADATA_TOKEN_URL: &str = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Source of bearer tokens for control-plane requests.
pub enum TokenSource {
    /// No `Authorization` header; used against local fakes.
    Anonymous,
    Static(String),
    /// Instance metadata server, cached until shortly before expiry.
    Metadata {
        client: Client,
        url: String,
        cached: Mutex<Option<(String, Instant)>>,
    },
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Anonymous => f.write_str("Anonymous"),
            TokenSource::Static(_) => f.write_str("Static(..)"),
            TokenSource::Metadata { url, .. } => {
                f.debug_struct("Metadata").field("url", url).finish()
            }
        }
    }
}

impl TokenSource {
    pub fn metadata(url: impl Into<String>) -> Self {
        TokenSource::Metadata {
            client: Client::new(),
            url: url.into(),
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> ControlResult<Option<String>> {
        match self {
            TokenSource::Anonymous => Ok(None),
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Metadata {
                client,
                url,
                cached,
            } => {
                let mut guard = cached.lock().await;
                if let Some((token, expires_at)) = guard.as_ref() {
                    if Instant::now() < *expires_at {
                        return Ok(Some(token.clone()));
                    }
                }
                debug!(url = %url, "Fetching access token from metadata server");
                let resp = client
                    .get(url.as_str())
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    return Err(ControlPlaneError::Auth(format!(
                        "metadata server returned {}",
                        resp.status()
                    )));
                }
                let token: MetadataToken = resp.json().await?;
                let ttl = Duration::from_secs(token.expires_in)
                    .saturating_sub(EXPIRY_MARGIN);
                *guard = Some((token.access_token.clone(), Instant::now() + ttl));
                Ok(Some(token.access_token))
            }
        }
    }
}
