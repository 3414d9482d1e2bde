//! Tool-call types: streamed fragments and assembled requests.

use serde::{Deserialize, Serialize};

/// A partial tool call delivered inside one stream event, keyed by `index`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallFragment {
    #[serde(default)]
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionFragment>,
}

impl ToolCallFragment {
    /// Fragment carrying only (part of) the call id.
    pub fn with_id(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Fragment carrying (part of) the function name and/or arguments.
    pub fn with_function(
        index: usize,
        name: Option<&str>,
        arguments: Option<&str>,
    ) -> Self {
        Self {
            index,
            function: Some(FunctionFragment {
                name: name.map(str::to_string),
                arguments: arguments.map(str::to_string),
            }),
            ..Default::default()
        }
    }
}

/// Function part of a [`ToolCallFragment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// A fully assembled tool call, ready to be invoked once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCallRequest {
    /// Empty accumulator for a newly seen fragment index.
    pub fn empty() -> Self {
        Self {
            id: String::new(),
            kind: "function".to_string(),
            function: FunctionCall::default(),
        }
    }

    /// Parse the concatenated arguments as JSON.
    pub fn parse_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.function.arguments)
    }
}

/// Function name and JSON-encoded arguments of a tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// A tool definition advertised to the model (OpenAI `tools` entry).
///
/// Kept as raw JSON because tool lists can also arrive from a tool server
/// mid-conversation in whatever shape it produces.
pub type ToolDefinition = serde_json::Value;
