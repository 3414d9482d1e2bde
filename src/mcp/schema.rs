//! Tool schemas and results as the rest of the crate sees them.

use rmcp::model::{CallToolResult, Tool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema for a tool exposed by an MCP server (`tools/list` entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_input_schema", rename = "inputSchema")]
    pub input_schema: Value,
}

fn default_input_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl McpToolSchema {
    /// The tool as a chat-completions `tools` entry under `exposed_name`.
    pub fn to_openai_tool(&self, exposed_name: &str) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": exposed_name,
                "description": self.description.clone().unwrap_or_default(),
                "parameters": self.input_schema,
            }
        })
    }
}

impl From<Tool> for McpToolSchema {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()),
            input_schema: Value::Object((*tool.input_schema).clone()),
        }
    }
}

/// Wrap a call result in the `{"result": ...}` envelope the catalog reads.
pub fn result_envelope(result: &CallToolResult) -> serde_json::Result<Value> {
    Ok(serde_json::json!({ "result": serde_json::to_value(result)? }))
}
