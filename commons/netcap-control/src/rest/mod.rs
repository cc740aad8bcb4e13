//! Control-plane and logging clients for the Google Cloud REST surfaces.

mod auth;
mod logging;
mod run;

pub use auth::*;
pub use logging::*;
pub use run::*;

use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ControlPlaneError, ControlResult};

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

async fn send_json<T>(
    token: &TokenSource,
    request: RequestBuilder,
) -> ControlResult<T>
where
    T: DeserializeOwned,
{
    let request = match token.token().await? {
        Some(t) => request.bearer_auth(t),
        None => request,
    };
    let response = request.send().await?;
    handle_response(response).await
}

async fn handle_response<T>(response: Response) -> ControlResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if status.is_success() {
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "{}" } else { &text };
        return Ok(serde_json::from_str(text)?);
    }
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let (message, rpc_status) = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(env) => (env.error.message, env.error.status),
        Err(_) => (text, None),
    };
    Err(ControlPlaneError::from_status(
        status.as_u16(),
        rpc_status.as_deref(),
        message,
    ))
}
