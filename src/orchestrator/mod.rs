//! The reply engine: streams a model answer into the open document and runs
//! tool rounds in between.
//!
//! A session is a loop over rounds. Each round resolves settings, builds the
//! request, streams it, and either finishes the reply or invokes the tools
//! the model asked for and feeds their results into the next round.

pub mod run_flag;
pub mod session;

pub use run_flag::RunFlag;
pub use session::{ContentFilter, HeadBuffer, SessionState};

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use strum::Display;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::options::get_i64;
use crate::config::{LlmOptions, McpMode, SettingValue, SettingsStore, MODEL_SLOTS};
use crate::conversation::{build_messages, ConversationOptions, QueryType};
use crate::editor::{CursorPosition, EditorHost, Indicator, Notice};
use crate::error::{NoteLlmError, Result};
use crate::mcp::{
    capability_prompt, tool_groups_from_result, tool_results_message, wrap_tool_result,
    HttpToolTransport, ToolCatalog, ToolOutput, ToolTransport, AGENT_TOOL, TOOL_GROUPS_TOOL,
};
use crate::provider::{
    build_request_body, open_chat_stream, probe_models, ProbeResult, ToolAttachment,
    MODEL_PROBE_TIMEOUT,
};
use crate::stream::{SseEvent, ToolCallAssembler};
use crate::texts::Texts;
use crate::types::{ChatCompletionChunk, Message, ReplyKind, ToolCallRequest, ToolDefinition};

/// Rounds after which tools are no longer offered.
pub const MAX_TOOL_ROUNDS: u32 = 5;

/// Consecutive unparsable stream lines that end a session.
pub const MAX_PARSE_FAILURES: u32 = 5;

/// What to reply to.
#[derive(Debug, Clone, Default)]
pub struct ReplyRequest {
    pub input: String,
    /// Ready-made conversation; used instead of `input` when non-empty.
    pub messages: Vec<Message>,
    pub query_type: QueryType,
}

impl ReplyRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReplyStatus {
    Completed,
    Stopped,
}

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub session_id: Uuid,
    pub status: ReplyStatus,
    /// Model requests made, tool rounds included.
    pub requests: u32,
    /// Reply text written into the document, framing excluded.
    pub text: String,
}

struct Round {
    number: u32,
    messages: Vec<Message>,
    /// Tool list handed over by the previous round.
    tools: Option<Vec<ToolDefinition>>,
}

enum RoundReply {
    Content,
    ToolCalls(Vec<ToolCallRequest>),
}

/// Drives reply sessions against one editor and settings store.
pub struct ReplyOrchestrator {
    settings: Arc<dyn SettingsStore>,
    editor: Arc<dyn EditorHost>,
    tools: Arc<dyn ToolTransport>,
    run_flag: RunFlag,
    texts: &'static Texts,
}

impl ReplyOrchestrator {
    pub fn new(settings: Arc<dyn SettingsStore>, editor: Arc<dyn EditorHost>) -> Self {
        Self {
            settings,
            editor,
            tools: Arc::new(HttpToolTransport::new()),
            run_flag: RunFlag::new(),
            texts: Texts::for_locale("en"),
        }
    }

    pub fn with_tool_transport(mut self, tools: Arc<dyn ToolTransport>) -> Self {
        self.tools = tools;
        self
    }

    /// Share a run flag with another owner, e.g. a signal handler.
    pub fn with_run_flag(mut self, run_flag: RunFlag) -> Self {
        self.run_flag = run_flag;
        self
    }

    pub fn with_texts(mut self, texts: &'static Texts) -> Self {
        self.texts = texts;
        self
    }

    pub fn run_flag(&self) -> &RunFlag {
        &self.run_flag
    }

    /// Stream a reply into the document at the cursor.
    ///
    /// A request made while another session runs stops both. Being stopped
    /// is reported as [`ReplyStatus::Stopped`]; every other failure is shown
    /// to the user and returned.
    pub async fn reply(&self, request: ReplyRequest) -> Result<ReplyOutcome> {
        if !self.run_flag.start() {
            self.run_flag.clear();
            warn!("reply requested while another was running");
            self.editor.notify(Notice::warning("Force stopped!", 3000)).await;
            return Ok(ReplyOutcome {
                session_id: Uuid::new_v4(),
                status: ReplyStatus::Stopped,
                requests: 0,
                text: String::new(),
            });
        }

        let mut session = match self.editor.document_id().await {
            Ok(document) => SessionState::new(document),
            Err(e) => {
                self.run_flag.clear();
                return Err(e);
            }
        };
        info!(session = %session.id, query = %request.query_type, "reply started");

        let result = self.run(&request, &mut session).await;
        if let Err(e) = &result {
            self.report(e).await;
        }
        self.cleanup(&mut session, &result).await;

        let status = match result {
            Ok(()) => ReplyStatus::Completed,
            Err(NoteLlmError::ForcedStop) => ReplyStatus::Stopped,
            Err(e) => return Err(e),
        };
        info!(
            session = %session.id,
            %status,
            requests = session.requests,
            chars = session.output.chars().count(),
            "reply finished"
        );
        Ok(ReplyOutcome {
            session_id: session.id,
            status,
            requests: session.requests,
            text: session.output,
        })
    }

    /// Ask a running session to stop at its next check.
    ///
    /// Returns whether a session was running.
    pub async fn stop(&self) -> bool {
        let was_running = self.run_flag.stop();
        let notice = if was_running {
            Notice::warning("NoteLLM force stopped!", 3000)
        } else {
            Notice::finish("NoteLLM stopped.", 3000)
        };
        self.editor.notify(notice).await;
        was_running
    }

    /// Select model slot `slot`, or the next one, then check it.
    pub async fn change_model(&self, slot: Option<u8>) -> Result<u8> {
        let target = match slot {
            Some(n) if (1..=MODEL_SLOTS).contains(&n) => n,
            Some(n) => {
                return Err(NoteLlmError::InvalidArgument(format!(
                    "model slot {n} does not exist"
                )))
            }
            None => {
                let current = get_i64(self.settings.as_ref(), "llmSelect")
                    .await?
                    .unwrap_or(1);
                match u8::try_from(current) {
                    Ok(n) if (1..MODEL_SLOTS).contains(&n) => n + 1,
                    _ => 1,
                }
            }
        };

        self.settings
            .set("llmSelect", SettingValue::from(i64::from(target)))
            .await?;
        let options = LlmOptions::load(self.settings.as_ref()).await?;
        info!(slot = target, model = %options.model, "model slot selected");
        self.editor
            .notify(Notice::info(
                format!("LLM {target} ({}) selected!", options.model),
                3000,
            ))
            .await;

        self.check_status(false).await?;
        Ok(target)
    }

    /// Validate the selected slot and probe its server.
    ///
    /// Problems are always shown; success only when `show_ok` is set.
    pub async fn check_status(&self, show_ok: bool) -> Result<ProbeResult> {
        let options = LlmOptions::load(self.settings.as_ref()).await?;
        let blank = if options.model.trim().is_empty() {
            Some("Model Name is Empty?")
        } else if options.url.trim().is_empty() {
            Some("Model URL is Empty?")
        } else if options.key.trim().is_empty() {
            Some("Model Key is Empty?")
        } else {
            None
        };
        let result = match blank {
            Some(problem) => ProbeResult {
                available: false,
                error: Some(problem.to_string()),
            },
            None => probe_models(&options.url, &options.key, MODEL_PROBE_TIMEOUT).await,
        };

        if result.available {
            debug!(slot = options.slot, "model server reachable");
            if show_ok {
                self.editor
                    .notify(Notice::finish(
                        format!("LLM {} Status: OK (Model = {})", options.slot, options.model),
                        3000,
                    ))
                    .await;
            }
        } else {
            let problem = result.error.as_deref().unwrap_or("Connection_Error");
            warn!(slot = options.slot, error = problem, "model server check failed");
            self.editor
                .notify(Notice::warning(
                    format!(
                        "LLM {} Error: {problem} (Model = {})",
                        options.slot, options.model
                    ),
                    4000,
                ))
                .await;
        }
        Ok(result)
    }

    async fn run(&self, request: &ReplyRequest, session: &mut SessionState) -> Result<()> {
        let mut options = LlmOptions::load(self.settings.as_ref()).await?;
        options.validate()?;
        session.scroll = options.scroll;

        self.editor.move_cursor_to_selection_end().await?;
        self.editor.scroll(options.scroll).await?;
        session.cursor = self.read_cursor().await;

        let mut catalog = ToolCatalog::default();
        let mut round = Round {
            number: 0,
            messages: request.messages.clone(),
            tools: None,
        };

        loop {
            if round.number > 0 {
                if !self.run_flag.is_running() {
                    return Err(NoteLlmError::ForcedStop);
                }
                options = LlmOptions::load(self.settings.as_ref()).await?;
                options.validate()?;
            }

            let tools_active = options.tools_configured() && round.number <= MAX_TOOL_ROUNDS;
            let messages = build_messages(
                &request.input,
                &round.messages,
                &self.conversation_options(request, &options, tools_active),
            );
            let attachment = if !tools_active {
                ToolAttachment::None
            } else {
                match round.tools.take() {
                    Some(list) if !list.is_empty() => ToolAttachment::Explicit(list),
                    _ => {
                        catalog =
                            ToolCatalog::discover(self.tools.as_ref(), &options.mcp_servers).await;
                        ToolAttachment::Discovered(catalog.tools().to_vec())
                    }
                }
            };
            let body = build_request_body(&options, &messages, &attachment);

            session.requests += 1;
            debug!(
                session = %session.id,
                round = round.number,
                tools_active,
                messages = messages.len(),
                "requesting model reply"
            );

            match self.stream_round(session, &options, &body).await? {
                RoundReply::ToolCalls(calls) if tools_active => {
                    round = self
                        .run_tools(options.mcp_mode, &catalog, &calls, messages, round.number)
                        .await;
                }
                reply => {
                    if let RoundReply::ToolCalls(calls) = reply {
                        warn!(
                            session = %session.id,
                            calls = calls.len(),
                            round = round.number,
                            "tool calls requested after tool use ended"
                        );
                    }
                    self.finish_content(session).await?;
                    self.editor.notify(Notice::finish("Finished.", 2000)).await;
                    return Ok(());
                }
            }
        }
    }

    fn conversation_options(
        &self,
        request: &ReplyRequest,
        options: &LlmOptions,
        tools_active: bool,
    ) -> ConversationOptions {
        ConversationOptions::builder()
            .query_type(request.query_type)
            .advanced_chat(options.advanced_chat)
            .chat_prompt(options.chat_prompt.clone())
            .maybe_tool_prompt(tools_active.then(capability_prompt))
            .texts(self.texts)
            .build()
    }

    /// Stream one model response, writing visible content as it arrives.
    async fn stream_round(
        &self,
        session: &mut SessionState,
        options: &LlmOptions,
        body: &Value,
    ) -> Result<RoundReply> {
        self.show(Indicator::Waiting).await;
        let mut events = open_chat_stream(&options.url, &options.key, body).await?;

        let mut kind = ReplyKind::Unknown;
        let mut assembler = ToolCallAssembler::new();
        let mut filter = ContentFilter::new(options.hide_thinking);
        let mut head = HeadBuffer::new(&options.model);
        let mut thinking = false;
        let mut failures = 0u32;

        loop {
            self.check_active(session, failures).await?;

            let Some(event) = events.next().await else {
                break;
            };
            let data = match event? {
                SseEvent::Done => break,
                SseEvent::Data(data) => data,
            };
            let chunk = match serde_json::from_str::<ChatCompletionChunk>(&data) {
                Ok(chunk) => {
                    failures = 0;
                    chunk
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "skipping unparsable stream line");
                    continue;
                }
            };
            let Some(choice) = chunk.first_choice() else {
                continue;
            };

            kind = kind.observe(
                choice.finish_reason.as_deref(),
                choice.delta.tool_calls.is_some(),
            );
            if let Some(fragments) = &choice.delta.tool_calls {
                assembler.extend(fragments)?;
                continue;
            }
            let Some(content) = choice.delta.content.as_deref() else {
                continue;
            };

            let visible = filter.accept(content);
            self.sync_thinking(&mut thinking, filter.is_thinking()).await;
            if let Some(text) = head.push(&visible) {
                self.write(session, &options.model, &text).await?;
            }
        }

        self.hide(Indicator::Waiting).await;
        self.sync_thinking(&mut thinking, false).await;

        if kind == ReplyKind::ToolCalls && !assembler.is_empty() {
            debug!(fragments = assembler.fragment_count(), "assembling tool calls");
            return Ok(RoundReply::ToolCalls(assembler.finish()?));
        }

        let rest = filter.finish();
        let text = match head.push(&rest) {
            Some(text) => text,
            None => head.flush(),
        };
        self.write(session, &options.model, &text).await?;
        Ok(RoundReply::Content)
    }

    /// Invoke every requested tool and prepare the next round.
    ///
    /// A failing tool is logged and contributes no result.
    async fn run_tools(
        &self,
        mode: McpMode,
        catalog: &ToolCatalog,
        calls: &[ToolCallRequest],
        messages: Vec<Message>,
        round: u32,
    ) -> Round {
        let mut counter = round;
        let mut results = Vec::new();
        let mut first_output: Option<ToolOutput> = None;

        for call in calls {
            let exposed = match mode {
                McpMode::Agent => AGENT_TOOL,
                _ => call.function.name.as_str(),
            };
            let label = match mode {
                McpMode::Agent => call.function.arguments.as_str(),
                _ => exposed,
            };
            let status = format!("[{mode}]Calling {label}, please wait...");
            self.show(Indicator::ToolCall(status.clone())).await;

            match catalog.invoke(self.tools.as_ref(), call, exposed).await {
                Ok(output) => {
                    info!(tool = exposed, round, "tool call succeeded");
                    results.push(wrap_tool_result(exposed, &call.function.arguments, &output.text));
                    first_output.get_or_insert(output);
                    if mode == McpMode::Agent {
                        counter = MAX_TOOL_ROUNDS + 1;
                    }
                }
                Err(e) => warn!(tool = exposed, round, error = %e, "tool call failed"),
            }
            self.hide(Indicator::ToolCall(status)).await;
        }

        let last = calls.last().map(|call| call.function.name.as_str());
        if last == Some(TOOL_GROUPS_TOOL) {
            let tools = first_output
                .map(|output| tool_groups_from_result(&output.text, Some(&output.envelope)))
                .unwrap_or_default();
            debug!(tools = tools.len(), "tool groups resolved");
            return Round {
                number: counter + 1,
                messages,
                tools: Some(tools),
            };
        }

        let mut messages = messages;
        messages.push(Message::user(tool_results_message(&results)));
        Round {
            number: counter + 1,
            messages,
            tools: None,
        }
    }

    /// Exit checks made before every stream read, in order.
    async fn check_active(&self, session: &SessionState, failures: u32) -> Result<()> {
        if self.editor.document_id().await? != session.document {
            return Err(NoteLlmError::ContextChanged);
        }
        if failures >= MAX_PARSE_FAILURES {
            return Err(NoteLlmError::Parse { failures });
        }
        if !self.run_flag.is_running() {
            return Err(NoteLlmError::ForcedStop);
        }
        Ok(())
    }

    /// Write reply text, preceded by the header on first output.
    async fn write(&self, session: &mut SessionState, model: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(header) = session.header_for(text, model) {
            self.insert(session, &header).await?;
            session.header_printed = true;
        }
        self.insert(session, text).await?;
        session.output.push_str(text);
        Ok(())
    }

    async fn insert(&self, session: &mut SessionState, text: &str) -> Result<()> {
        if self.editor.document_id().await? != session.document {
            return Err(NoteLlmError::ContextChanged);
        }
        if let Some(cursor) = session.cursor {
            if let Err(e) = self.editor.set_cursor(cursor).await {
                debug!(error = %e, "could not restore cursor");
            }
        }
        self.editor.insert_text(text).await?;
        self.editor.scroll(session.scroll).await?;
        session.cursor = self.read_cursor().await;
        Ok(())
    }

    async fn finish_content(&self, session: &mut SessionState) -> Result<()> {
        if session.tail_printed || session.output.trim().is_empty() {
            return Ok(());
        }
        let tail = if session.output_has_tail() {
            "\n\n".to_string()
        } else {
            session.tail()
        };
        self.insert(session, &tail).await?;
        session.tail_printed = true;
        Ok(())
    }

    async fn cleanup(&self, session: &mut SessionState, result: &Result<()>) {
        self.hide(Indicator::Waiting).await;
        self.hide(Indicator::Thinking).await;

        let document_lost = matches!(result, Err(NoteLlmError::ContextChanged));
        if !document_lost && !session.tail_printed && !session.output.trim().is_empty() {
            let tail = session.tail();
            match self.insert(session, &tail).await {
                Ok(()) => session.tail_printed = true,
                Err(e) => warn!(error = %e, "could not close the reply"),
            }
        }
        self.run_flag.clear();
    }

    async fn report(&self, e: &NoteLlmError) {
        if e.is_silent() {
            return;
        }
        error!(error = %e, category = ?e.category(), "reply failed");
        let message = match e {
            NoteLlmError::Configuration(_) => format!("ERROR: {}", self.texts.err_llm_conf),
            NoteLlmError::ContextChanged => format!("ERROR: {}", self.texts.err_note_changed),
            NoteLlmError::Parse { .. } => self.texts.err_wrong.to_string(),
            NoteLlmError::Network(_) if e.is_cors_like() => {
                format!("ERROR: {e}\n{}", self.texts.err_cors)
            }
            other => format!("ERROR: {other}"),
        };
        self.editor.notify(Notice::error(message, 5000)).await;
    }

    async fn read_cursor(&self) -> Option<CursorPosition> {
        match self.editor.cursor().await {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                warn!(error = %e, "could not read cursor position");
                None
            }
        }
    }

    async fn sync_thinking(&self, shown: &mut bool, thinking: bool) {
        if *shown == thinking {
            return;
        }
        *shown = thinking;
        if thinking {
            self.show(Indicator::Thinking).await;
        } else {
            self.hide(Indicator::Thinking).await;
        }
    }

    async fn show(&self, indicator: Indicator) {
        if let Err(e) = self.editor.show_indicator(indicator).await {
            debug!(error = %e, "could not show indicator");
        }
    }

    async fn hide(&self, indicator: Indicator) {
        if let Err(e) = self.editor.hide_indicator(indicator).await {
            debug!(error = %e, "could not hide indicator");
        }
    }
}

impl std::fmt::Debug for ReplyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyOrchestrator")
            .field("running", &self.run_flag.is_running())
            .finish_non_exhaustive()
    }
}
