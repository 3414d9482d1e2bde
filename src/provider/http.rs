//! Shared HTTP client, request headers and error mapping.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};

use crate::error::NoteLlmError;

/// User agent sent with every model request.
pub const CLIENT_USER_AGENT: &str = "NoteLLM";

const ANTHROPIC_HOST: &str = "api.anthropic.com";
const ANTHROPIC_BROWSER_ACCESS: &str = "anthropic-dangerous-direct-browser-access";

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// Only connecting is bounded; a streaming body may stay open indefinitely.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Content type and Bearer authorization.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Headers for a chat-completions request to `url`.
pub fn chat_headers(url: &str, api_key: &str) -> HeaderMap {
    let mut headers = bearer_headers(api_key);
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    if url.contains(ANTHROPIC_HOST) {
        headers.insert(
            HeaderName::from_static(ANTHROPIC_BROWSER_ACCESS),
            HeaderValue::from_static("true"),
        );
    }
    headers
}

/// Convert a non-success response into an error carrying status and body.
pub async fn response_error(resp: reqwest::Response) -> NoteLlmError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    NoteLlmError::api(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        body,
    )
}
