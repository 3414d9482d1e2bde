//! Model Context Protocol (MCP) tool discovery and invocation.

pub mod catalog;
pub mod schema;
pub mod transport;

pub use catalog::{
    capability_prompt, tool_groups_from_result, tool_result_text, tool_results_message,
    wrap_tool_result, CatalogEntry, ToolCatalog, ToolOutput, AGENT_TOOL, TOOL_GROUPS_TOOL,
};
pub use schema::{result_envelope, McpToolSchema};
pub use transport::{HttpToolTransport, ToolTransport};
