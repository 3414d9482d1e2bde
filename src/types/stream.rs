//! Streaming wire types for chat-completion chunks.

use serde::{Deserialize, Serialize};

use super::tool::ToolCallFragment;

/// One `data:` payload of a chat-completions stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Delta and finish reason of the first choice, if any.
    pub fn first_choice(&self) -> Option<&ChunkChoice> {
        self.choices.first()
    }
}

/// A single choice inside a stream chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental payload of a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
}

/// What kind of reply a stream turned out to be.
///
/// Decided on the first informative event and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Unknown,
    Content,
    ToolCalls,
}

impl ReplyKind {
    /// Settle the kind from one event, unless it is already settled.
    pub fn observe(self, finish_reason: Option<&str>, has_tool_calls: bool) -> Self {
        if self != ReplyKind::Unknown {
            return self;
        }
        match finish_reason {
            None if has_tool_calls => ReplyKind::ToolCalls,
            None => ReplyKind::Unknown,
            Some("tool_calls") => ReplyKind::ToolCalls,
            Some(_) => ReplyKind::Content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_without_delta_fields_parses() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        let choice = chunk.first_choice().unwrap();
        assert!(choice.delta.content.is_none());
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn chunk_without_choices_is_rejected() {
        assert!(serde_json::from_str::<ChatCompletionChunk>(r#"{"id":"x"}"#).is_err());
    }

    #[test]
    fn reply_kind_is_pinned_by_first_informative_event() {
        let kind = ReplyKind::Unknown.observe(None, false);
        assert_eq!(kind, ReplyKind::Unknown);

        let kind = kind.observe(None, true);
        assert_eq!(kind, ReplyKind::ToolCalls);

        assert_eq!(kind.observe(Some("stop"), false), ReplyKind::ToolCalls);
    }

    #[test]
    fn finish_reason_decides_kind() {
        assert_eq!(
            ReplyKind::Unknown.observe(Some("tool_calls"), false),
            ReplyKind::ToolCalls
        );
        assert_eq!(ReplyKind::Unknown.observe(Some("stop"), false), ReplyKind::Content);
        assert_eq!(ReplyKind::Content.observe(None, true), ReplyKind::Content);
    }
}
