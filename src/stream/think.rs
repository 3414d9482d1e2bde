//! Separating reasoning text from the answer in a streamed reply.
//!
//! Reasoning is recognised on whole lines only, either as a `<think>` ...
//! `</think>` block or as a `*Thinking...*` line followed by `>` quoted
//! lines. The splitter rescans the accumulated text until the answer has
//! started, after which fragments pass straight through.

use crate::util::text::trim_leading_newlines;

/// The convention that opened a reasoning block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkMarker {
    /// `<think>` on its own line, closed by `</think>` on its own line.
    TagDelimited,
    /// `*Thinking...*` on its own line, followed by `>` quoted lines. The
    /// block ends at the first non-blank line that is not quoted.
    QuoteBlockDelimited,
}

impl ThinkMarker {
    pub const TAG_OPEN: &'static str = "<think>";
    pub const TAG_CLOSE: &'static str = "</think>";
    pub const QUOTE_OPEN: &'static str = "*Thinking...*";

    /// Marker opened by a trimmed line, if any.
    pub fn detect(line: &str) -> Option<Self> {
        match line {
            Self::TAG_OPEN => Some(Self::TagDelimited),
            Self::QUOTE_OPEN => Some(Self::QuoteBlockDelimited),
            _ => None,
        }
    }

    /// Whether a partial line could still grow into an opening marker.
    fn could_open(line: &str) -> bool {
        !line.is_empty() && (Self::TAG_OPEN.starts_with(line) || Self::QUOTE_OPEN.starts_with(line))
    }

    /// Start tracking a block opened by this marker.
    pub fn block(self) -> ThinkBlock {
        ThinkBlock {
            marker: self,
            previous_quoted: false,
        }
    }
}

/// How a reasoning block ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The line is the closing marker and belongs to neither channel.
    ClosedByLine,
    /// The line is already part of the answer.
    ClosedBeforeLine,
}

/// An open reasoning block, fed one trimmed line at a time.
#[derive(Debug, Clone)]
pub struct ThinkBlock {
    marker: ThinkMarker,
    previous_quoted: bool,
}

impl ThinkBlock {
    pub fn marker(&self) -> ThinkMarker {
        self.marker
    }

    /// Feed the next line after the opening marker.
    pub fn advance(&mut self, line: &str) -> Option<Transition> {
        match self.marker {
            ThinkMarker::TagDelimited => {
                (line == ThinkMarker::TAG_CLOSE).then_some(Transition::ClosedByLine)
            }
            ThinkMarker::QuoteBlockDelimited => {
                // Blank lines keep the quoted state of the line before them.
                if line.is_empty() {
                    return None;
                }
                let quoted = line.starts_with('>');
                let closes = !quoted && self.previous_quoted;
                self.previous_quoted = quoted;
                closes.then_some(Transition::ClosedBeforeLine)
            }
        }
    }
}

/// Where the splitter is in the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkStatus {
    NotStarted,
    Thinking(ThinkMarker),
    Ended,
}

/// Incremental think/content splitter over a growing reply.
#[derive(Debug, Clone)]
pub struct ThinkSplitter {
    whole: String,
    content: String,
    think: String,
    think_delta: Option<String>,
    status: ThinkStatus,
}

impl Default for ThinkSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkSplitter {
    pub fn new() -> Self {
        Self {
            whole: String::new(),
            content: String::new(),
            think: String::new(),
            think_delta: None,
            status: ThinkStatus::NotStarted,
        }
    }

    pub fn status(&self) -> ThinkStatus {
        self.status
    }

    /// Answer text emitted so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Reasoning text recognised so far.
    pub fn think_text(&self) -> &str {
        &self.think
    }

    /// Reasoning added by the last call, `None` if it was not an extension.
    pub fn think_delta(&self) -> Option<&str> {
        self.think_delta.as_deref()
    }

    /// Feed the next decoded fragment and return the new answer text.
    ///
    /// Returns `Some("")` while nothing new is visible and `None` if the
    /// answer computed from the whole text no longer extends what was
    /// already emitted.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.whole.push_str(fragment);
        if self.status == ThinkStatus::Ended {
            self.think_delta = Some(String::new());
            return Some(self.append_content(fragment));
        }
        self.rescan(false)
    }

    /// Resolve text held back at the end of the stream.
    pub fn finish(&mut self) -> Option<String> {
        match self.status {
            ThinkStatus::Ended => Some(String::new()),
            _ => self.rescan(true),
        }
    }

    fn append_content(&mut self, fragment: &str) -> String {
        if self.content.is_empty() {
            let fragment = trim_leading_newlines(fragment);
            self.content.push_str(fragment);
            fragment.to_string()
        } else {
            self.content.push_str(fragment);
            fragment.to_string()
        }
    }

    fn rescan(&mut self, at_end: bool) -> Option<String> {
        let lines = line_spans(&self.whole);
        let mut open: Option<(ThinkBlock, usize)> = None;

        for (i, &(start, end)) in lines.iter().enumerate() {
            let line = self.whole[start..end].trim();
            let is_last = i + 1 == lines.len();

            match open.as_mut() {
                None => {
                    if let Some(marker) = ThinkMarker::detect(line) {
                        open = Some((marker.block(), i));
                        continue;
                    }
                    if line.is_empty() {
                        continue;
                    }
                    if is_last && !at_end && ThinkMarker::could_open(line) {
                        self.think_delta = Some(String::new());
                        return Some(String::new());
                    }
                    return self.end_thinking(None, start);
                }
                Some((block, open_at)) => {
                    let content_start = match block.advance(line) {
                        Some(Transition::ClosedByLine) => (end + 1).min(self.whole.len()),
                        Some(Transition::ClosedBeforeLine) => start,
                        None => continue,
                    };
                    let think = join_lines(&self.whole, &lines[*open_at + 1..i]);
                    return self.end_thinking(Some(think), content_start);
                }
            }
        }

        match open {
            Some((block, open_at)) => {
                self.status = ThinkStatus::Thinking(block.marker());
                let upto = if at_end { lines.len() } else { lines.len() - 1 };
                let think = join_lines(&self.whole, &lines[(open_at + 1).min(upto)..upto]);
                self.record_think(think);
            }
            None => self.think_delta = Some(String::new()),
        }
        Some(String::new())
    }

    fn end_thinking(&mut self, think: Option<String>, content_start: usize) -> Option<String> {
        match think {
            Some(think) => self.record_think(think),
            None => self.think_delta = Some(String::new()),
        }
        self.status = ThinkStatus::Ended;

        let content = trim_leading_newlines(&self.whole[content_start..]).to_string();
        let delta = content.strip_prefix(self.content.as_str()).map(str::to_string);
        if delta.is_none() {
            tracing::warn!(previous = %self.content, "answer text is not an extension of emitted text");
        }
        self.content = content;
        delta
    }

    fn record_think(&mut self, think: String) {
        self.think_delta = think.strip_prefix(self.think.as_str()).map(str::to_string);
        self.think = think;
    }
}

/// Byte spans of the `\n`-separated segments, newline excluded.
fn line_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            spans.push((start, i));
            start = i + 1;
        }
    }
    spans.push((start, text.len()));
    spans
}

fn join_lines(text: &str, spans: &[(usize, usize)]) -> String {
    match (spans.first(), spans.last()) {
        (Some(&(start, _)), Some(&(_, end))) => text[start..end].to_string(),
        _ => String::new(),
    }
}
