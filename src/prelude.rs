//! Convenience re-exports for common use.

pub use crate::config::{FileSettings, LlmOptions, MemorySettings, SettingValue, SettingsStore};
pub use crate::conversation::{build_messages, ConversationOptions, QueryType};
pub use crate::editor::{CursorPosition, EditorHost, Indicator, Notice, NoticeLevel};
pub use crate::error::{NoteLlmError, Result};
pub use crate::mcp::{HttpToolTransport, ToolCatalog, ToolTransport};
pub use crate::orchestrator::{ReplyOrchestrator, ReplyOutcome, ReplyRequest, ReplyStatus, RunFlag};
pub use crate::types::{Message, Role};
