//! Chat-completions request bodies.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::config::LlmOptions;
use crate::types::{Message, ToolDefinition};

/// Tools offered to the model in one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolAttachment {
    #[default]
    None,
    /// Fetched from the tool servers for this request.
    Discovered(Vec<ToolDefinition>),
    /// Supplied by the previous round; forces temperature to 0.
    Explicit(Vec<ToolDefinition>),
}

/// Models that take `max_completion_tokens` and reject `temperature`
/// (OpenAI o1/o3/o4 and gpt-5 families).
pub fn is_reasoning_model(model: &str) -> bool {
    static O_SERIES: OnceLock<Regex> = OnceLock::new();
    static GPT5: OnceLock<Regex> = OnceLock::new();
    let o_series =
        O_SERIES.get_or_init(|| Regex::new(r"(?i)^(o1|o3|o4)(-|$)").expect("valid o-series pattern"));
    let gpt5 = GPT5.get_or_init(|| Regex::new(r"(?i)^gpt-5").expect("valid gpt-5 pattern"));
    o_series.is_match(model) || gpt5.is_match(model)
}

/// Build the streaming request body for `messages`.
pub fn build_request_body(
    options: &LlmOptions,
    messages: &[Message],
    tools: &ToolAttachment,
) -> Value {
    let mut body = json!({
        "model": options.model,
        "messages": messages,
        "stream": true,
    });

    if is_reasoning_model(&options.model) {
        body["max_completion_tokens"] = json!(options.max_tokens);
    } else {
        body["temperature"] = json!(options.temperature);
        body["max_tokens"] = json!(options.max_tokens);
    }

    match tools {
        ToolAttachment::None => {}
        ToolAttachment::Discovered(list) => {
            if !list.is_empty() {
                body["tools"] = Value::Array(list.clone());
            }
        }
        ToolAttachment::Explicit(list) => {
            body["tools"] = Value::Array(list.clone());
            body["temperature"] = json!(0);
        }
    }

    merge_extra_config(&mut body, &options.extra_config);
    body
}

/// Shallow-merge a user-supplied JSON object over `body`.
///
/// Blank input is ignored; invalid JSON or a non-object is logged and skipped.
pub fn merge_extra_config(body: &mut Value, extra: &str) {
    let extra = extra.trim();
    if extra.is_empty() {
        return;
    }
    let parsed: Map<String, Value> = match serde_json::from_str::<Value>(extra) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "extra config is not a JSON object, ignoring");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "extra config is not valid JSON, ignoring");
            return;
        }
    };
    if let Value::Object(target) = body {
        for (key, value) in parsed {
            target.insert(key, value);
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{McpMode, McpServerList, ScrollMode};
    use pretty_assertions::assert_eq;

    fn options(model: &str) -> LlmOptions {
        LlmOptions {
            slot: 1,
            model: model.to_string(),
            url: "http://localhost/v1/chat/completions".into(),
            key: "sk-test".into(),
            extra_config: String::new(),
            mcp_mode: McpMode::Off,
            scroll: ScrollMode::None,
            advanced_chat: false,
            hide_thinking: false,
            chat_prompt: String::new(),
            temperature: 0.5,
            max_tokens: 256,
            mcp_servers: McpServerList::default(),
        }
    }

    #[test]
    fn reasoning_models_are_recognised() {
        for model in ["o1", "o1-mini", "O3-pro", "o4-mini", "gpt-5", "gpt-5-preview", "GPT-5.1"] {
            assert!(is_reasoning_model(model), "{model}");
        }
        for model in ["gpt-4o", "o10", "deepseek-chat", "claude-o1", "gpt-4.1"] {
            assert!(!is_reasoning_model(model), "{model}");
        }
    }

    #[test]
    fn reasoning_model_body_has_no_temperature() {
        let body = build_request_body(&options("gpt-5-preview"), &[Message::user("hi")], &ToolAttachment::None);
        assert_eq!(body["max_completion_tokens"], 256);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn standard_model_body_has_temperature_and_max_tokens() {
        let body = build_request_body(&options("gpt-4o"), &[Message::user("hi")], &ToolAttachment::None);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 256);
        assert!(body.get("max_completion_tokens").is_none());
        assert_eq!(body["messages"][0], json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn explicit_tools_force_zero_temperature() {
        let tools = vec![json!({ "type": "function", "function": { "name": "now" } })];
        let body = build_request_body(&options("gpt-4o"), &[], &ToolAttachment::Explicit(tools));
        assert_eq!(body["temperature"], 0);
        assert_eq!(body["tools"][0]["function"]["name"], "now");
    }

    #[test]
    fn empty_discovered_tools_are_not_attached() {
        let body = build_request_body(&options("gpt-4o"), &[], &ToolAttachment::Discovered(vec![]));
        assert!(body.get("tools").is_none());
        assert_eq!(body["temperature"], 0.5);
    }

    #[test]
    fn extra_config_overrides_top_level_fields() {
        let mut opts = options("gpt-4o");
        opts.extra_config = r#"{"temperature": 1.2, "top_p": 0.9}"#.into();
        let body = build_request_body(&opts, &[], &ToolAttachment::None);
        assert_eq!(body["temperature"], 1.2);
        assert_eq!(body["top_p"], 0.9);
    }

    #[test]
    fn malformed_extra_config_is_ignored() {
        let mut body = json!({ "model": "m" });
        merge_extra_config(&mut body, "{oops");
        merge_extra_config(&mut body, "[1, 2]");
        assert_eq!(body, json!({ "model": "m" }));
    }
}
