//! Shared test helpers: a recording editor, a scripted tool server and SSE
//! body builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notellm::config::{McpServer, MemorySettings, ScrollMode, SettingValue};
use notellm::editor::{CursorPosition, EditorHost, Indicator, Notice, NoticeLevel};
use notellm::error::{NoteLlmError, Result};
use notellm::mcp::{McpToolSchema, ToolTransport};
use notellm::orchestrator::{ReplyOrchestrator, RunFlag};

pub const MODEL: &str = "test-model";

/// An editor that keeps the document in memory and records every call.
#[derive(Default)]
pub struct RecordingEditor {
    document: Mutex<String>,
    text: Mutex<String>,
    cursor: Mutex<usize>,
    notices: Mutex<Vec<Notice>>,
    indicators: Mutex<Vec<(bool, Indicator)>>,
    /// Switch documents after this many inserts.
    switch_after: Mutex<Option<usize>>,
    /// Clear this run flag after this many inserts.
    stop_after: Mutex<Option<(usize, RunFlag)>>,
    inserts: Mutex<usize>,
}

impl RecordingEditor {
    pub fn new() -> Arc<Self> {
        let editor = Self::default();
        *editor.document.lock().unwrap() = "note-1".into();
        Arc::new(editor)
    }

    pub fn switch_document_after(&self, inserts: usize) {
        *self.switch_after.lock().unwrap() = Some(inserts);
    }

    pub fn stop_after(&self, inserts: usize, flag: RunFlag) {
        *self.stop_after.lock().unwrap() = Some((inserts, flag));
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn notice_messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    pub fn shown_indicators(&self) -> Vec<Indicator> {
        self.indicators
            .lock()
            .unwrap()
            .iter()
            .filter(|(shown, _)| *shown)
            .map(|(_, indicator)| indicator.clone())
            .collect()
    }
}

#[async_trait]
impl EditorHost for RecordingEditor {
    async fn document_id(&self) -> Result<String> {
        Ok(self.document.lock().unwrap().clone())
    }

    async fn move_cursor_to_selection_end(&self) -> Result<()> {
        let end = self.text.lock().unwrap().chars().count();
        *self.cursor.lock().unwrap() = end;
        Ok(())
    }

    async fn cursor(&self) -> Result<CursorPosition> {
        Ok(CursorPosition::new(*self.cursor.lock().unwrap()))
    }

    async fn set_cursor(&self, position: CursorPosition) -> Result<()> {
        *self.cursor.lock().unwrap() = position.offset;
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        let mut doc = self.text.lock().unwrap();
        let mut cursor = self.cursor.lock().unwrap();
        let at = doc
            .char_indices()
            .nth(*cursor)
            .map(|(i, _)| i)
            .unwrap_or(doc.len());
        doc.insert_str(at, text);
        *cursor += text.chars().count();

        let mut inserts = self.inserts.lock().unwrap();
        *inserts += 1;
        if *self.switch_after.lock().unwrap() == Some(*inserts) {
            *self.document.lock().unwrap() = "note-2".into();
        }
        if let Some((n, flag)) = self.stop_after.lock().unwrap().as_ref() {
            if *n == *inserts {
                flag.stop();
            }
        }
        Ok(())
    }

    async fn scroll(&self, _mode: ScrollMode) -> Result<()> {
        Ok(())
    }

    async fn show_indicator(&self, indicator: Indicator) -> Result<()> {
        self.indicators.lock().unwrap().push((true, indicator));
        Ok(())
    }

    async fn hide_indicator(&self, indicator: Indicator) -> Result<()> {
        self.indicators.lock().unwrap().push((false, indicator));
        Ok(())
    }

    async fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// A tool server with a fixed tool list and queued call results.
#[derive(Default)]
pub struct ScriptedToolTransport {
    tools: Vec<McpToolSchema>,
    results: Mutex<VecDeque<Value>>,
    /// Always answer with this result once the queue is empty.
    fallback: Option<Value>,
    calls: Mutex<Vec<(String, Value)>>,
    listings: Mutex<usize>,
}

impl ScriptedToolTransport {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names
                .iter()
                .map(|name| McpToolSchema {
                    name: (*name).to_string(),
                    description: Some(format!("{name} tool")),
                    input_schema: json!({ "type": "object", "properties": {} }),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn queue_text(self, text: &str) -> Self {
        self.results.lock().unwrap().push_back(text_result(text));
        self
    }

    pub fn always(mut self, text: &str) -> Self {
        self.fallback = Some(text_result(text));
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn listings(&self) -> usize {
        *self.listings.lock().unwrap()
    }
}

#[async_trait]
impl ToolTransport for ScriptedToolTransport {
    async fn list_tools(&self, _server: &McpServer) -> Result<Vec<McpToolSchema>> {
        *self.listings.lock().unwrap() += 1;
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, _server: &McpServer, name: &str, arguments: Value) -> Result<Value> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| NoteLlmError::tool(name, "no scripted result"))
    }
}

pub fn text_result(text: &str) -> Value {
    json!({ "result": { "content": [{ "type": "text", "text": text }] } })
}

/// Settings for one slot pointing at `server`.
pub fn settings_for(server: &MockServer) -> Vec<(String, SettingValue)> {
    vec![
        ("llmModel".into(), MODEL.into()),
        ("llmServerType".into(), SettingValue::Int(0)),
        ("llmServerUrl".into(), format!("{}/v1", server.uri()).into()),
        ("llmKey".into(), "sk-test".into()),
    ]
}

pub fn memory_settings(server: &MockServer, extra: &[(&str, SettingValue)]) -> Arc<MemorySettings> {
    let mut values = settings_for(server);
    values.extend(extra.iter().map(|(k, v)| ((*k).to_string(), v.clone())));
    Arc::new(MemorySettings::with_values(values))
}

/// Settings extras enabling one tool server in `mode` (10 = mcp, 20 = agent).
pub fn tool_settings(mode: i64) -> Vec<(&'static str, SettingValue)> {
    vec![
        ("llmMcp", SettingValue::Int(mode)),
        ("llmMcpEnabled_01", SettingValue::Bool(true)),
        ("llmMcpServer_01", "http://tools.local/mcp".into()),
    ]
}

pub fn orchestrator(
    settings: Arc<MemorySettings>,
    editor: Arc<RecordingEditor>,
    tools: Arc<ScriptedToolTransport>,
) -> ReplyOrchestrator {
    ReplyOrchestrator::new(settings, editor).with_tool_transport(tools)
}

/// An SSE body streaming `deltas` as content, then `stop`.
pub fn content_stream(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let chunk = json!({ "choices": [{ "delta": { "content": delta }, "finish_reason": null }] });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    let stop = json!({ "choices": [{ "delta": {}, "finish_reason": "stop" }] });
    body.push_str(&format!("data: {stop}\n\ndata: [DONE]\n\n"));
    body
}

/// An SSE body with one tool call split across fragments.
pub fn tool_call_stream(name: &str, arguments: &str) -> String {
    let (head, tail) = arguments.split_at(arguments.len() / 2);
    let chunks = [
        json!({ "choices": [{ "delta": { "tool_calls": [{ "index": 0, "id": "call_1", "type": "function", "function": { "name": name, "arguments": "" } }] }, "finish_reason": null }] }),
        json!({ "choices": [{ "delta": { "tool_calls": [{ "index": 0, "function": { "arguments": head } }] }, "finish_reason": null }] }),
        json!({ "choices": [{ "delta": { "tool_calls": [{ "index": 0, "function": { "arguments": tail } }] }, "finish_reason": null }] }),
        json!({ "choices": [{ "delta": {}, "finish_reason": "tool_calls" }] }),
    ];
    let mut body: String = chunks.iter().map(|c| format!("data: {c}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn sse(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

/// Mount a chat endpoint that answers every request with `body`.
pub async fn mount_chat(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse(body))
        .mount(server)
        .await;
}

/// Request bodies the chat endpoint received, in order.
pub async fn chat_requests(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/v1/chat/completions")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}
