//! State owned by one reply session and by each of its model rounds.

use uuid::Uuid;

use crate::config::ScrollMode;
use crate::conversation::{reply_header, REPLY_TAIL};
use crate::editor::CursorPosition;
use crate::stream::{ThinkSplitter, ThinkStatus};
use crate::util::text::{trailing_newlines, trim_leading_newlines};

/// Blank lines kept around the header and tail.
const FRAME_NEWLINES: usize = 2;

/// Everything a session carries from one round to the next.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: Uuid,
    /// Document the reply was started in.
    pub document: String,
    /// Where the next insert goes.
    pub cursor: Option<CursorPosition>,
    pub scroll: ScrollMode,
    /// Reply text written so far, framing excluded.
    pub output: String,
    pub header_printed: bool,
    pub tail_printed: bool,
    /// Model requests made.
    pub requests: u32,
}

impl SessionState {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document: document.into(),
            cursor: None,
            scroll: ScrollMode::default(),
            output: String::new(),
            header_printed: false,
            tail_printed: false,
            requests: 0,
        }
    }

    /// Header to insert before `text`, if this is the first visible output.
    pub fn header_for(&self, text: &str, model: &str) -> Option<String> {
        (!text.is_empty() && !self.header_printed && self.output.is_empty()).then(|| {
            format!(
                "{}{}{}",
                "\n".repeat(FRAME_NEWLINES),
                reply_header(model),
                "\n".repeat(FRAME_NEWLINES)
            )
        })
    }

    /// Closing marker, with fewer leading newlines when the output already
    /// ends with some.
    pub fn tail(&self) -> String {
        let missing = FRAME_NEWLINES.saturating_sub(trailing_newlines(&self.output));
        format!("{}{REPLY_TAIL}\n\n", "\n".repeat(missing))
    }

    /// The model wrote the closing marker itself.
    pub fn output_has_tail(&self) -> bool {
        self.output.trim_end().ends_with(REPLY_TAIL)
    }
}

/// Holds the start of a round's text back until it is clear whether the
/// model echoed the reply header.
#[derive(Debug, Clone)]
pub struct HeadBuffer {
    header: String,
    pending: String,
    flushed: bool,
}

impl HeadBuffer {
    pub fn new(model: &str) -> Self {
        Self {
            header: reply_header(model),
            pending: String::new(),
            flushed: false,
        }
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Buffer `text`; returns what may be written now.
    pub fn push(&mut self, text: &str) -> Option<String> {
        if self.flushed {
            return Some(text.to_string());
        }
        self.pending.push_str(text);
        let len = self.pending.chars().count();
        if len > 10 && !self.pending.trim_start().starts_with("**") {
            return Some(self.flush());
        }
        if len > 5 + self.header.chars().count() {
            return Some(self.flush());
        }
        None
    }

    /// Release whatever is buffered, minus an echoed header.
    pub fn flush(&mut self) -> String {
        self.flushed = true;
        let pending = std::mem::take(&mut self.pending);
        if pending.trim_start().starts_with(&self.header) {
            let rest = pending.replacen(&self.header, "", 1);
            return trim_leading_newlines(rest.trim_start_matches([' ', '\t'])).to_string();
        }
        pending
    }
}

/// Whole-token reasoning markers some servers send as separate deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenThink {
    Idle,
    Thinking,
    Closed,
    Done,
}

/// Per-round filter deciding which content deltas reach the document.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    hide_thinking: bool,
    token: TokenThink,
    splitter: ThinkSplitter,
}

impl ContentFilter {
    pub fn new(hide_thinking: bool) -> Self {
        Self {
            hide_thinking,
            token: TokenThink::Idle,
            splitter: ThinkSplitter::new(),
        }
    }

    /// Reasoning is in progress and hidden.
    pub fn is_thinking(&self) -> bool {
        self.hide_thinking
            && (self.token == TokenThink::Thinking
                || matches!(self.splitter.status(), ThinkStatus::Thinking(_)))
    }

    /// Visible text for one content delta.
    pub fn accept(&mut self, delta: &str) -> String {
        let token = delta.trim();
        let mut delta = delta;
        match self.token {
            TokenThink::Idle if matches!(token, "<think>" | "<THINK>") => {
                self.token = TokenThink::Thinking;
                if self.hide_thinking {
                    return String::new();
                }
            }
            TokenThink::Thinking => {
                if matches!(token, "</think>" | "</THINK>") {
                    self.token = TokenThink::Closed;
                }
                if self.hide_thinking {
                    return String::new();
                }
            }
            TokenThink::Closed => {
                if token.is_empty() {
                    if self.hide_thinking {
                        return String::new();
                    }
                } else {
                    self.token = TokenThink::Done;
                    if self.hide_thinking {
                        delta = delta.trim_start();
                    }
                }
            }
            _ => {}
        }

        if !self.hide_thinking {
            return delta.to_string();
        }
        self.splitter.push(delta).unwrap_or_else(|| {
            tracing::warn!("dropping answer delta that does not extend emitted text");
            String::new()
        })
    }

    /// Text still held back when the stream ends.
    pub fn finish(&mut self) -> String {
        if !self.hide_thinking {
            return String::new();
        }
        self.splitter.finish().unwrap_or_default()
    }
}
