//! NoteLLM — streaming chat-completion replies for a note editor.
//!
//! Builds a conversation from the user's note, streams an OpenAI-compatible
//! chat completion into the host document, hides reasoning when asked, and
//! runs tool-call rounds against MCP servers.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use notellm::prelude::*;
//!
//! # async fn example(editor: Arc<dyn EditorHost>) -> notellm::Result<()> {
//! let settings = Arc::new(FileSettings::open_default()?);
//! let orchestrator = ReplyOrchestrator::new(settings, editor);
//! let outcome = orchestrator.reply(ReplyRequest::new("What is a monad?")).await?;
//! println!("{} requests", outcome.requests);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversation;
pub mod editor;
pub mod error;
pub mod mcp;
pub mod orchestrator;
pub mod prelude;
pub mod provider;
pub mod stream;
pub mod texts;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{NoteLlmError, Result};
