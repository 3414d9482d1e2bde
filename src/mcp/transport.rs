//! Tool discovery and invocation against MCP servers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{CallToolRequestParams, JsonObject};
use rmcp::service::{ClientInitializeError, RoleClient, RunningService, ServiceError};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::schema::{result_envelope, McpToolSchema};
use crate::config::McpServer;
use crate::error::{NoteLlmError, Result};
use crate::util::timeout::with_timeout;

type McpService = RunningService<RoleClient, ()>;

/// Request/response service used to list and call remote tools.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Tools offered by `server`.
    async fn list_tools(&self, server: &McpServer) -> Result<Vec<McpToolSchema>>;

    /// Invoke `name` on `server`; the result comes back as `{"result": ...}`.
    async fn call_tool(&self, server: &McpServer, name: &str, arguments: Value) -> Result<Value>;
}

/// MCP over streamable HTTP, one `rmcp` client session per server URL.
pub struct HttpToolTransport {
    services: Mutex<HashMap<String, Arc<McpService>>>,
    request_timeout: Duration,
}

impl Default for HttpToolTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpToolTransport {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Transport whose handshakes and requests give up after `request_timeout`.
    pub fn with_timeout(request_timeout: Duration) -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
            request_timeout,
        }
    }

    /// The live session for `server`, connecting when there is none.
    async fn service(&self, server: &McpServer) -> Result<Arc<McpService>> {
        let mut services = self.services.lock().await;
        if let Some(service) = services.get(&server.url) {
            if !service.is_closed() {
                return Ok(Arc::clone(service));
            }
            debug!(url = %server.url, "MCP session closed, reconnecting");
            services.remove(&server.url);
        }

        let service = Arc::new(with_timeout(self.request_timeout, connect(server)).await?);
        services.insert(server.url.clone(), Arc::clone(&service));
        Ok(service)
    }

    async fn forget(&self, server: &McpServer) {
        self.services.lock().await.remove(&server.url);
    }

    /// Run `op` on the session for `server`. A session whose transport has
    /// gone away is replaced once before giving up.
    async fn run<T, F, Fut>(&self, server: &McpServer, context: &str, op: F) -> Result<T>
    where
        F: Fn(Arc<McpService>) -> Fut,
        Fut: Future<Output = std::result::Result<T, ServiceError>>,
    {
        let mut reconnected = false;
        loop {
            let service = self.service(server).await?;
            let outcome = tokio::time::timeout(self.request_timeout, op(service))
                .await
                .map_err(|_| NoteLlmError::Timeout(self.request_timeout.as_millis() as u64))?;
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if is_transport_failure(&e) && !reconnected => {
                    warn!(url = %server.url, error = %e, "MCP session lost, reconnecting");
                    self.forget(server).await;
                    reconnected = true;
                }
                Err(e) => return Err(map_service_error(context, e)),
            }
        }
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn list_tools(&self, server: &McpServer) -> Result<Vec<McpToolSchema>> {
        let tools = self
            .run(server, "tools/list", |service| async move {
                service.list_all_tools().await
            })
            .await?;
        Ok(tools.into_iter().map(McpToolSchema::from).collect())
    }

    async fn call_tool(&self, server: &McpServer, name: &str, arguments: Value) -> Result<Value> {
        debug!(url = %server.url, tool = name, "calling MCP tool");
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: tool_arguments(arguments)?,
            task: None,
        };
        let result = self
            .run(server, name, |service| {
                let params = params.clone();
                async move { service.call_tool(params).await }
            })
            .await?;
        Ok(result_envelope(&result)?)
    }
}

async fn connect(server: &McpServer) -> Result<McpService> {
    let client = reqwest::Client::builder()
        .default_headers(custom_headers(server))
        .build()?;
    let transport = StreamableHttpClientTransport::with_client(
        client,
        StreamableHttpClientTransportConfig::with_uri(server.url.clone()),
    );
    let service = rmcp::serve_client((), transport)
        .await
        .map_err(|e| map_initialize_error(&server.url, e))?;
    info!(
        url = %server.url,
        server = service
            .peer()
            .peer_info()
            .map(|info| info.server_info.name.as_str())
            .unwrap_or_default(),
        "MCP server initialized"
    );
    Ok(service)
}

fn custom_headers(server: &McpServer) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in server.header_map() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(url = %server.url, header = %name, "skipping invalid mcp header"),
        }
    }
    headers
}

/// Call arguments as a JSON object; `null` and blank strings mean none.
fn tool_arguments(value: Value) -> Result<Option<JsonObject>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        Value::String(raw) if raw.trim().is_empty() => Ok(None),
        Value::String(raw) => tool_arguments(serde_json::from_str(raw.trim()).map_err(|e| {
            NoteLlmError::InvalidArgument(format!("tool arguments must be valid JSON: {e}"))
        })?),
        other => Err(NoteLlmError::InvalidArgument(format!(
            "tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn is_transport_failure(error: &ServiceError) -> bool {
    matches!(
        error,
        ServiceError::TransportSend(_) | ServiceError::TransportClosed
    )
}

fn map_initialize_error(url: &str, error: ClientInitializeError) -> NoteLlmError {
    match error {
        ClientInitializeError::JsonRpcError(error) => NoteLlmError::tool(
            "initialize",
            format!("MCP error {}: {}", error.code.0, error.message),
        ),
        other => NoteLlmError::Stream(format!("MCP initialize failed for {url}: {other}")),
    }
}

fn map_service_error(context: &str, error: ServiceError) -> NoteLlmError {
    match error {
        ServiceError::McpError(error) => NoteLlmError::tool(
            context,
            format!("MCP error {}: {}", error.code.0, error.message),
        ),
        ServiceError::Timeout { timeout } => NoteLlmError::Timeout(timeout.as_millis() as u64),
        lost @ (ServiceError::TransportSend(_) | ServiceError::TransportClosed) => {
            NoteLlmError::Stream(format!("{context}: MCP transport failed: {lost}"))
        }
        other => NoteLlmError::tool(context, other.to_string()),
    }
}
