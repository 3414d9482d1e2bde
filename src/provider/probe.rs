//! Connectivity checks against model and tool servers.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::http::{bearer_headers, shared_client};
use super::CHAT_COMPLETIONS_PATH;
use crate::error::NoteLlmError;
use crate::util::timeout::with_timeout;

/// Default limit for [`check_server_status`].
pub const SERVER_CHECK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default limit for [`probe_models`].
pub const MODEL_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Models-listing URL derived from a chat-completions URL.
pub fn models_url(chat_url: &str) -> String {
    chat_url.replacen(CHAT_COMPLETIONS_PATH, "/models", 1)
}

/// Outcome of probing a model endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub available: bool,
    pub error: Option<String>,
}

impl ProbeResult {
    fn ok() -> Self {
        Self {
            available: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            available: false,
            error: Some(error.into()),
        }
    }
}

/// Probe the models endpoint belonging to `chat_url` with the given key.
///
/// Transport failures are reported in the result, not as errors.
pub async fn probe_models(chat_url: &str, api_key: &str, timeout: Duration) -> ProbeResult {
    let url = models_url(chat_url);
    let request = shared_client()
        .head(&url)
        .headers(bearer_headers(api_key))
        .send();
    let response = with_timeout(timeout, async { request.await.map_err(NoteLlmError::from) }).await;

    match response {
        Ok(resp) if resp.status().is_success() => ProbeResult::ok(),
        Ok(resp) => {
            let status = resp.status();
            tracing::debug!(url = %url, status = status.as_u16(), "model probe rejected");
            ProbeResult::failed(match status.canonical_reason() {
                Some(reason) => format!("HTTP {} {reason}", status.as_u16()),
                None => format!("HTTP {}", status.as_u16()),
            })
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "model probe failed");
            ProbeResult::failed(e.to_string())
        }
    }
}

/// Network-level reachability of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    Timeout,
}

/// Reachability report for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCheck {
    pub status: ServerStatus,
    pub message: String,
}

/// Send a HEAD request and report whether anything answered in time.
///
/// Any HTTP response counts as online, whatever its status.
pub async fn check_server_status(url: &str, timeout: Duration) -> ServerCheck {
    let request = shared_client().head(url).send();
    match with_timeout(timeout, async { request.await.map_err(NoteLlmError::from) }).await {
        Ok(_) => ServerCheck {
            status: ServerStatus::Online,
            message: format!("Server {url} is reachable on the network."),
        },
        Err(NoteLlmError::Timeout(ms)) => ServerCheck {
            status: ServerStatus::Timeout,
            message: format!("Connection to server {url} timed out (exceeded {ms}ms)."),
        },
        Err(e) => ServerCheck {
            status: ServerStatus::Offline,
            message: format!("Unable to connect to server {url}. Error: {e}"),
        },
    }
}
