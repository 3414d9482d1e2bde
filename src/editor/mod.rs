//! Host editor collaborator: the document the reply is written into.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::config::ScrollMode;
use crate::error::Result;

/// Character offset of the cursor within the active document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub offset: usize,
}

impl CursorPosition {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }
}

/// Floating progress overlay shown while a reply is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Indicator {
    #[strum(serialize = "waiting")]
    Waiting,
    #[strum(serialize = "thinking")]
    Thinking,
    /// A tool is running; carries the status line.
    #[strum(serialize = "tool")]
    ToolCall(String),
}

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Finish,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration_ms: u64,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            level,
            message: message.into(),
            duration_ms,
        }
    }

    pub fn info(message: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(NoticeLevel::Info, message, duration_ms)
    }

    pub fn finish(message: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(NoticeLevel::Finish, message, duration_ms)
    }

    pub fn warning(message: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(NoticeLevel::Warning, message, duration_ms)
    }

    pub fn error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(NoticeLevel::Error, message, duration_ms)
    }
}

/// Everything the reply engine needs from the editor hosting the document.
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Identity of the document currently open; changes when the user
    /// switches notes.
    async fn document_id(&self) -> Result<String>;

    /// Collapse any selection and put the cursor after it.
    async fn move_cursor_to_selection_end(&self) -> Result<()>;

    async fn cursor(&self) -> Result<CursorPosition>;

    async fn set_cursor(&self, position: CursorPosition) -> Result<()>;

    /// Insert `text` at the cursor, leaving the cursor after it.
    async fn insert_text(&self, text: &str) -> Result<()>;

    /// Keep the cursor in view.
    async fn scroll(&self, mode: ScrollMode) -> Result<()>;

    async fn show_indicator(&self, indicator: Indicator) -> Result<()>;

    async fn hide_indicator(&self, indicator: Indicator) -> Result<()>;

    /// Show a toast. Failures are the host's concern.
    async fn notify(&self, notice: Notice);
}
