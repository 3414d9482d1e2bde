//! An [`EditorHost`] that appends the reply to standard output.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::config::ScrollMode;
use crate::editor::{CursorPosition, EditorHost, Indicator, Notice};
use crate::error::Result;

/// Stdout is the document; status and notices go to stderr.
#[derive(Debug, Default)]
pub struct TerminalEditor {
    written: AtomicUsize,
    quiet: bool,
}

impl TerminalEditor {
    pub fn new(quiet: bool) -> Self {
        Self {
            written: AtomicUsize::new(0),
            quiet,
        }
    }
}

#[async_trait]
impl EditorHost for TerminalEditor {
    async fn document_id(&self) -> Result<String> {
        Ok("stdout".to_string())
    }

    async fn move_cursor_to_selection_end(&self) -> Result<()> {
        Ok(())
    }

    async fn cursor(&self) -> Result<CursorPosition> {
        Ok(CursorPosition::new(self.written.load(Ordering::SeqCst)))
    }

    // Output is append-only.
    async fn set_cursor(&self, _position: CursorPosition) -> Result<()> {
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        self.written.fetch_add(text.chars().count(), Ordering::SeqCst);
        Ok(())
    }

    async fn scroll(&self, _mode: ScrollMode) -> Result<()> {
        Ok(())
    }

    async fn show_indicator(&self, indicator: Indicator) -> Result<()> {
        match indicator {
            Indicator::ToolCall(status) if !self.quiet => eprintln!("{status}"),
            other => tracing::debug!(indicator = %other, "indicator shown"),
        }
        Ok(())
    }

    async fn hide_indicator(&self, indicator: Indicator) -> Result<()> {
        tracing::debug!(%indicator, "indicator hidden");
        Ok(())
    }

    async fn notify(&self, notice: Notice) {
        if !self.quiet {
            eprintln!("[{}] {}", notice.level, notice.message);
        }
    }
}
