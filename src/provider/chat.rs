//! Streaming chat-completions call.

use futures::stream::BoxStream;
use serde_json::Value;
use tracing::debug;

use super::http::{chat_headers, response_error, shared_client};
use crate::error::Result;
use crate::stream::{sse_events, SseEvent};

/// Events of one streaming response.
pub type ChatEventStream = BoxStream<'static, Result<SseEvent>>;

/// POST `body` to `url` and return its event stream.
///
/// A non-success status is returned as [`crate::NoteLlmError::Api`] with the
/// response body.
pub async fn open_chat_stream(url: &str, api_key: &str, body: &Value) -> Result<ChatEventStream> {
    debug!(
        url,
        model = body.get("model").and_then(serde_json::Value::as_str).unwrap_or_default(),
        "opening chat stream"
    );

    let resp = shared_client()
        .post(url)
        .headers(chat_headers(url, api_key))
        .json(body)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(response_error(resp).await);
    }

    Ok(Box::pin(sse_events(resp.bytes_stream())))
}
