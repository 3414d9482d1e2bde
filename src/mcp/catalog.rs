//! Tool catalog: discovered tools, the names exposed to the model and how
//! they map back to a server.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::transport::ToolTransport;
use crate::config::{McpServer, McpServerList};
use crate::error::{NoteLlmError, Result};
use crate::types::{ToolCallRequest, ToolDefinition};

/// Bookkeeping tool whose result is the tool list for the next round.
pub const TOOL_GROUPS_TOOL: &str = "get_tool_groups";

/// Name every call is routed to in agent mode.
pub const AGENT_TOOL: &str = "call_agents";

/// Where an exposed tool name really lives.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub function_name: String,
    pub server: McpServer,
}

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// `result.content[0].text`, empty when the response has none.
    pub text: String,
    /// The call result wrapped as `{"result": ...}`.
    pub envelope: Value,
}

/// Tools gathered from every configured server.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
    entries: HashMap<String, CatalogEntry>,
}

impl ToolCatalog {
    /// List tools on every server. A server that fails is logged and skipped.
    ///
    /// A name already taken by an earlier server is exposed as `{name}_{index}`.
    pub async fn discover(transport: &dyn ToolTransport, servers: &McpServerList) -> Self {
        let mut catalog = Self::default();
        for (index, server) in servers.iter().enumerate() {
            let schemas = match transport.list_tools(server).await {
                Ok(schemas) => schemas,
                Err(e) => {
                    warn!(url = %server.url, error = %e, "tool discovery failed");
                    continue;
                }
            };
            debug!(url = %server.url, count = schemas.len(), "tools discovered");
            for schema in schemas {
                let exposed = if catalog.entries.contains_key(&schema.name) {
                    format!("{}_{index}", schema.name)
                } else {
                    schema.name.clone()
                };
                catalog.tools.push(schema.to_openai_tool(&exposed));
                catalog.entries.insert(
                    exposed,
                    CatalogEntry {
                        function_name: schema.name,
                        server: server.clone(),
                    },
                );
            }
        }
        catalog
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, exposed_name: &str) -> Option<&CatalogEntry> {
        self.entries.get(exposed_name)
    }

    /// Invoke one assembled call under `exposed_name`, which overrides the
    /// name the model used in agent mode.
    pub async fn invoke(
        &self,
        transport: &dyn ToolTransport,
        call: &ToolCallRequest,
        exposed_name: &str,
    ) -> Result<ToolOutput> {
        let entry = self.get(exposed_name).ok_or_else(|| {
            NoteLlmError::tool(exposed_name, "tool is not offered by any configured server")
        })?;
        let arguments = parse_call_arguments(call)?;
        let envelope = transport
            .call_tool(&entry.server, &entry.function_name, arguments)
            .await?;
        let text = tool_result_text(&envelope).unwrap_or_else(|| {
            debug!(tool = exposed_name, "tool response carries no text content");
            String::new()
        });
        Ok(ToolOutput { text, envelope })
    }
}

/// Arguments as a JSON object; blank or empty arguments become `{}`.
fn parse_call_arguments(call: &ToolCallRequest) -> Result<Value> {
    if call.function.arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match call.parse_arguments() {
        Ok(Value::Null) => Ok(Value::Object(Default::default())),
        Ok(value) => Ok(value),
        Err(e) => Err(NoteLlmError::tool(
            &call.function.name,
            format!("arguments are not valid JSON: {e}"),
        )),
    }
}

/// `result.content[0].text` of a tool response, or of its first element
/// when the response is an array.
pub fn tool_result_text(envelope: &Value) -> Option<String> {
    let response = match envelope {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match &response["result"]["content"][0]["text"] {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// One tool result in the form the model reads it back.
pub fn wrap_tool_result(name: &str, arguments: &str, result: &str) -> String {
    format!("<name>{name}</name>\n<args>{arguments}</args>\n<result>{result}</result>")
}

/// The user message carrying every result of one round.
pub fn tool_results_message(results: &[String]) -> String {
    format!("<tool_result> {} </tool_result>", results.join("\n"))
}

/// Tool list returned by the bookkeeping tool.
///
/// The result text is read as JSON first; the raw envelope's `result.tools`
/// is the fallback.
pub fn tool_groups_from_result(text: &str, envelope: Option<&Value>) -> Vec<ToolDefinition> {
    let from_text = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|value| value["result"]["tools"].as_array().cloned());
    if let Some(tools) = from_text {
        return tools;
    }
    envelope
        .and_then(|value| value["result"]["tools"].as_array().cloned())
        .unwrap_or_else(|| {
            warn!("tool group result has no tool list");
            Vec::new()
        })
}

/// System prompt telling the model that tools are available.
pub fn capability_prompt() -> &'static str {
    "You can call external tools through MCP. When a tool would help answer the \
     request, call it with arguments that match its schema. Tool results are \
     returned inside <tool_result> tags; use them to write the final answer. \
     If no tool is needed, answer directly."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::schema::McpToolSchema;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct TwoServers;

    #[async_trait]
    impl ToolTransport for TwoServers {
        async fn list_tools(&self, server: &McpServer) -> Result<Vec<McpToolSchema>> {
            if server.url.ends_with("down") {
                return Err(NoteLlmError::Stream("down".into()));
            }
            Ok(vec![McpToolSchema {
                name: "now".into(),
                description: Some(format!("time from {}", server.url)),
                input_schema: json!({ "type": "object" }),
            }])
        }

        async fn call_tool(&self, server: &McpServer, name: &str, arguments: Value) -> Result<Value> {
            Ok(json!({
                "result": { "content": [{ "text": format!("{}:{name}:{arguments}", server.url) }] }
            }))
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCallRequest {
        let mut call = ToolCallRequest::empty();
        call.id = "call_1".into();
        call.function.name = name.into();
        call.function.arguments = arguments.into();
        call
    }

    #[tokio::test]
    async fn colliding_names_get_server_suffix() {
        let servers = McpServerList::parse("http://a|http://down|http://b", "");
        let catalog = ToolCatalog::discover(&TwoServers, &servers).await;

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tools()[1]["function"]["name"], "now_2");
        let entry = catalog.get("now_2").unwrap();
        assert_eq!(entry.function_name, "now");
        assert_eq!(entry.server.url, "http://b");
    }

    #[tokio::test]
    async fn invoke_routes_to_backing_server() {
        let servers = McpServerList::parse("http://a|http://b", "");
        let catalog = ToolCatalog::discover(&TwoServers, &servers).await;

        let output = catalog
            .invoke(&TwoServers, &call("now_1", r#"{"tz":"UTC"}"#), "now_1")
            .await
            .unwrap();
        assert_eq!(output.text, r#"http://b:now:{"tz":"UTC"}"#);

        let output = catalog.invoke(&TwoServers, &call("now", ""), "now").await.unwrap();
        assert_eq!(output.text, "http://a:now:{}");
    }

    #[tokio::test]
    async fn unknown_or_malformed_calls_fail() {
        let catalog = ToolCatalog::discover(&TwoServers, &McpServerList::parse("http://a", "")).await;
        assert!(catalog.invoke(&TwoServers, &call("nope", "{}"), "nope").await.is_err());
        assert!(catalog.invoke(&TwoServers, &call("now", "{oops"), "now").await.is_err());
    }

    #[test]
    fn result_text_from_object_or_array() {
        let single = json!({ "result": { "content": [{ "text": "a" }] } });
        assert_eq!(tool_result_text(&single).as_deref(), Some("a"));
        let array = json!([{ "result": { "content": [{ "text": "b" }] } }]);
        assert_eq!(tool_result_text(&array).as_deref(), Some("b"));
        assert_eq!(tool_result_text(&json!({ "result": {} })), None);
    }

    #[test]
    fn results_are_wrapped_and_joined() {
        let one = wrap_tool_result("now", "{}", "12:00");
        assert_eq!(one, "<name>now</name>\n<args>{}</args>\n<result>12:00</result>");
        assert_eq!(
            tool_results_message(&[one.clone(), one.clone()]),
            format!("<tool_result> {one}\n{one} </tool_result>")
        );
    }

    #[test]
    fn tool_groups_prefer_result_text() {
        let text = r#"{"result":{"tools":[{"type":"function","function":{"name":"x"}}]}}"#;
        assert_eq!(tool_groups_from_result(text, None).len(), 1);

        let envelope = json!({ "result": { "tools": [{}, {}] } });
        assert_eq!(tool_groups_from_result("not json", Some(&envelope)).len(), 2);
        assert!(tool_groups_from_result("not json", None).is_empty());
    }
}
