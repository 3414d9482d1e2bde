//! Building the message list sent to the model.

pub mod transcript;

pub use transcript::{
    is_reply_footer, reply_header, split_text_to_messages, strip_think, REPLY_TAIL,
};

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::texts::Texts;
use crate::types::Message;
use crate::util::text::format_now;

/// Generic instruction used when no other prompt applies.
pub const DEFAULT_PROMPT: &str = "You are a helpful assistant.";

/// Final system instruction of every built conversation.
pub const LANGUAGE_PROMPT: &str = "Response in user query language.";

/// What the user asked the plugin to do with the selected text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Chat,
    Summary,
    Improve,
    Ask,
}

/// Inputs of [`build_messages`] besides the raw text.
#[derive(Debug, Clone, Builder)]
pub struct ConversationOptions {
    #[builder(default)]
    pub query_type: QueryType,
    /// Split the input into turns on reply headers and footers.
    #[builder(default)]
    pub advanced_chat: bool,
    /// Remove think blocks from earlier assistant turns.
    #[builder(default = true)]
    pub strip_thinking: bool,
    /// User-configured chat prompt; blank means use the locale default.
    #[builder(into, default)]
    pub chat_prompt: String,
    /// Capability advertisement appended when tools are offered.
    #[builder(into)]
    pub tool_prompt: Option<String>,
    #[builder(default = true)]
    pub include_time: bool,
    /// Timestamp override, `YYYY-MM-DD HH:MM:SS`. Defaults to local now.
    #[builder(into)]
    pub current_time: Option<String>,
    #[builder(default = Texts::for_locale("en"))]
    pub texts: &'static Texts,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConversationOptions {
    fn is_advanced_chat(&self) -> bool {
        self.query_type == QueryType::Chat && self.advanced_chat
    }

    /// The base instruction: configured chat prompt, then the chat default,
    /// then the generic prompt.
    pub fn base_prompt(&self) -> String {
        if !self.is_advanced_chat() {
            return DEFAULT_PROMPT.to_string();
        }
        let custom = self.chat_prompt.trim();
        if custom.is_empty() {
            self.texts.prompt_chat.to_string()
        } else {
            custom.to_string()
        }
    }
}

/// Build the ordered message list for a request.
///
/// A non-empty `explicit` list is returned unchanged; later tool rounds
/// carry their conversation this way.
pub fn build_messages(input: &str, explicit: &[Message], options: &ConversationOptions) -> Vec<Message> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }

    let mut messages = Vec::new();
    if options.include_time {
        let now = options.current_time.clone().unwrap_or_else(format_now);
        messages.push(Message::system(format!("<current_time> {now} </current_time>")));
    }
    messages.push(Message::system(options.base_prompt()));
    if let Some(tool_prompt) = &options.tool_prompt {
        messages.push(Message::system(tool_prompt.clone()));
    }
    messages.push(Message::system(LANGUAGE_PROMPT));

    if options.is_advanced_chat() {
        messages.extend(split_text_to_messages(input, options.strip_thinking));
    } else {
        messages.push(Message::user(input));
    }
    messages
}
