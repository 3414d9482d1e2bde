//! Splitting a chat transcript written in the document back into turns.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Message, Role};

/// Closing marker written after every reply.
pub const REPLY_TAIL: &str = "**End of response**";

/// Header line text for a reply from `model`, without surrounding newlines.
pub fn reply_header(model: &str) -> String {
    format!("**Response from {model}:**")
}

fn header_pattern() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^\*\*Response from (.+):\*\*$").expect("valid header pattern")
    })
}

fn think_pattern() -> &'static Regex {
    static THINK: OnceLock<Regex> = OnceLock::new();
    THINK.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think pattern"))
}

/// Whether `line` is a reply footer. Markdown escapes (`\*\*End of response\*\*`)
/// are accepted as well.
pub fn is_reply_footer(line: &str) -> bool {
    line.replace('\\', "").trim() == REPLY_TAIL
}

/// Remove every `<think>...</think>` span.
pub fn strip_think(text: &str) -> String {
    think_pattern().replace_all(text, "").into_owned()
}

/// Split a transcript into user and assistant turns.
///
/// Text between a reply header and footer belongs to the assistant, the rest
/// to the user. Adjacent blocks of the same role are merged, content is
/// trimmed and turns left empty are dropped.
pub fn split_text_to_messages(raw: &str, strip_thinking: bool) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut role = Role::User;

    fn flush(messages: &mut Vec<Message>, buffer: &mut Vec<&str>, role: Role) {
        if buffer.is_empty() {
            return;
        }
        let content = buffer.join("\n");
        buffer.clear();
        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push('\n');
                last.content.push_str(&content);
            }
            _ => messages.push(Message::new(role, content)),
        }
    }

    for line in raw.lines() {
        if header_pattern().is_match(line) {
            flush(&mut messages, &mut buffer, role);
            role = Role::Assistant;
            continue;
        }
        if is_reply_footer(line) {
            flush(&mut messages, &mut buffer, role);
            role = Role::User;
            continue;
        }
        buffer.push(line);
    }
    flush(&mut messages, &mut buffer, role);

    for message in &mut messages {
        if strip_thinking && message.role == Role::Assistant {
            message.content = strip_think(&message.content);
        }
        message.content = message.content.trim().to_string();
    }
    messages.retain(|m| !m.content.is_empty());
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_reply_becomes_assistant_turn() {
        let messages =
            split_text_to_messages("**Response from X:**\nhello\n**End of response**", true);
        assert_eq!(messages, vec![Message::assistant("hello")]);
    }

    #[test]
    fn plain_text_is_a_user_turn() {
        assert_eq!(split_text_to_messages("hi", true), vec![Message::user("hi")]);
    }

    #[test]
    fn conversation_alternates_roles() {
        let raw = "What is 2+2?\n\n**Response from deepseek-chat:**\n\n4\n\n**End of response**\n\nAnd 3+3?";
        assert_eq!(
            split_text_to_messages(raw, true),
            vec![
                Message::user("What is 2+2?"),
                Message::assistant("4"),
                Message::user("And 3+3?"),
            ]
        );
    }

    #[test]
    fn escaped_footer_is_recognised() {
        let raw = "**Response from m:**\nok\n\\*\\*End of response\\*\\*\nnext";
        assert_eq!(
            split_text_to_messages(raw, true),
            vec![Message::assistant("ok"), Message::user("next")]
        );
    }

    #[test]
    fn consecutive_replies_merge_into_one_turn() {
        let raw = "**Response from a:**\none\n**End of response**\n**Response from b:**\ntwo\n**End of response**";
        assert_eq!(
            split_text_to_messages(raw, true),
            vec![Message::assistant("one\ntwo")]
        );
    }

    #[test]
    fn think_blocks_are_removed_from_assistant_turns_only() {
        let raw = "<think>user text</think> q\n**Response from m:**\n<think>a\nb</think>\nanswer <think>x</think>done\n**End of response**";
        let messages = split_text_to_messages(raw, true);
        assert_eq!(messages[0], Message::user("<think>user text</think> q"));
        assert_eq!(messages[1], Message::assistant("answer done"));
    }

    #[test]
    fn think_blocks_are_kept_when_not_stripping() {
        let raw = "**Response from m:**\n<think>t</think>\nanswer\n**End of response**";
        let messages = split_text_to_messages(raw, false);
        assert_eq!(messages, vec![Message::assistant("<think>t</think>\nanswer")]);
    }

    #[test]
    fn strip_think_is_idempotent() {
        let once = strip_think("a<think>x</think>b<think>y</think>c");
        assert_eq!(once, "abc");
        assert_eq!(strip_think(&once), once);
    }

    #[test]
    fn crlf_lines_are_split() {
        let raw = "q\r\n**Response from m:**\r\nanswer\r\n**End of response**";
        assert_eq!(
            split_text_to_messages(raw, true),
            vec![Message::user("q"), Message::assistant("answer")]
        );
    }
}
