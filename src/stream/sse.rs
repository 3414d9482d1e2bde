//! Server-sent-events line handling for chat-completion streams.

use futures::{Stream, StreamExt};

use crate::error::NoteLlmError;

/// One meaningful line of an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line, prefix removed.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Re-assembles lines that arrive split across network reads.
///
/// Bytes are kept until a newline is seen so multi-byte characters cut
/// between reads decode correctly.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read and return the complete events it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final line that had no trailing newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        parse_line(&String::from_utf8_lossy(&line))
    }
}

/// Classify one line. Blank lines, comments and non-data fields yield `None`.
pub fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    let data = line.strip_prefix("data:")?;
    if data.trim() == "[DONE]" {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(data.trim_start().to_string()))
}

/// Turn a response byte stream into SSE events.
///
/// The stream ends after `[DONE]` or when the body ends. Transport errors
/// are yielded once and end the stream.
pub fn sse_events<S, B, E>(bytes: S) -> impl Stream<Item = Result<SseEvent, NoteLlmError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<NoteLlmError> + Send + 'static,
{
    async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        let mut done = false;
        futures::pin_mut!(bytes);

        'read: while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e.into());
                    break;
                }
            };
            for event in buffer.push(chunk.as_ref()) {
                done = event == SseEvent::Done;
                yield Ok(event);
                if done {
                    break 'read;
                }
            }
        }
        if !done {
            if let Some(event) = buffer.finish() {
                yield Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use pretty_assertions::assert_eq;

    #[test]
    fn complete_lines_become_events() {
        let mut buffer = SseLineBuffer::new();
        let events = buffer.push(b"data: {\"a\":1}\n\n: keep-alive\nevent: x\ndata: [DONE]\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
        );
    }

    #[test]
    fn split_line_is_rebuffered() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(b"data: {\"choi").is_empty());
        assert_eq!(
            buffer.push(b"ces\":[]}\n"),
            vec![SseEvent::Data("{\"choices\":[]}".into())]
        );
    }

    #[test]
    fn multibyte_character_split_across_reads() {
        let text = "data: 你好\n".as_bytes();
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(&text[..8]).is_empty());
        assert_eq!(buffer.push(&text[8..]), vec![SseEvent::Data("你好".into())]);
    }

    #[test]
    fn data_prefix_without_space_is_accepted() {
        assert_eq!(parse_line("data:{}"), Some(SseEvent::Data("{}".into())));
        assert_eq!(parse_line("  data: [DONE]  "), Some(SseEvent::Done));
        assert_eq!(parse_line("id: 3"), None);
    }

    #[test]
    fn unterminated_last_line_is_flushed() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(b"data: {}").is_empty());
        assert_eq!(buffer.finish(), Some(SseEvent::Data("{}".into())));
        assert_eq!(buffer.finish(), None);
    }

    #[tokio::test]
    async fn event_stream_stops_at_done() {
        let chunks: Vec<Result<Vec<u8>, NoteLlmError>> = vec![
            Ok(b"data: 1\ndata: [DO".to_vec()),
            Ok(b"NE]\ndata: 2\n".to_vec()),
        ];
        let events: Vec<_> = sse_events(stream::iter(chunks))
            .map(|e| e.unwrap())
            .collect()
            .await;
        assert_eq!(events, vec![SseEvent::Data("1".into()), SseEvent::Done]);
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let chunks: Vec<Result<Vec<u8>, NoteLlmError>> = vec![
            Ok(b"data: 1\n".to_vec()),
            Err(NoteLlmError::Stream("reset".into())),
            Ok(b"data: 2\n".to_vec()),
        ];
        let events: Vec<_> = sse_events(stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(NoteLlmError::Stream(_))));
    }
}
