//! Reassembly of tool calls streamed as index-keyed fragments.

use crate::error::{NoteLlmError, Result};
use crate::types::{ToolCallFragment, ToolCallRequest};

/// Highest number of tool calls accepted in one reply.
pub const MAX_TOOL_CALLS: usize = 128;

/// Accumulates fragments per `index` by plain concatenation in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ToolCallAssembler {
    calls: Vec<Option<ToolCallRequest>>,
    fragments: usize,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one fragment. Indexes at or above [`MAX_TOOL_CALLS`] are rejected.
    pub fn push(&mut self, fragment: &ToolCallFragment) -> Result<()> {
        if fragment.index >= MAX_TOOL_CALLS {
            return Err(NoteLlmError::Stream(format!(
                "tool call index {} exceeds the limit of {MAX_TOOL_CALLS}",
                fragment.index
            )));
        }
        self.fragments += 1;
        if self.calls.len() <= fragment.index {
            self.calls.resize(fragment.index + 1, None);
        }
        let call = self.calls[fragment.index].get_or_insert_with(ToolCallRequest::empty);

        if let Some(id) = &fragment.id {
            call.id.push_str(id);
        }
        if let Some(function) = &fragment.function {
            if let Some(name) = &function.name {
                call.function.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                call.function.arguments.push_str(arguments);
            }
        }
        Ok(())
    }

    /// Add every fragment of one stream event.
    pub fn extend<'a>(
        &mut self,
        fragments: impl IntoIterator<Item = &'a ToolCallFragment>,
    ) -> Result<()> {
        fragments.into_iter().try_for_each(|fragment| self.push(fragment))
    }

    pub fn is_empty(&self) -> bool {
        self.fragments == 0
    }

    /// Number of fragments received.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// The assembled calls in index order.
    ///
    /// Fails if an index below the highest one never received a fragment.
    pub fn finish(self) -> Result<Vec<ToolCallRequest>> {
        self.calls
            .into_iter()
            .enumerate()
            .map(|(index, call)| {
                call.ok_or_else(|| {
                    NoteLlmError::Stream(format!("tool call fragment index {index} never arrived"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatCompletionChunk;
    use pretty_assertions::assert_eq;

    #[test]
    fn id_pieces_are_concatenated() {
        let mut assembler = ToolCallAssembler::new();
        assembler.push(&ToolCallFragment::with_id(0, "ab")).unwrap();
        assembler.push(&ToolCallFragment::with_id(0, "cd")).unwrap();

        let calls = assembler.finish().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "abcd");
        assert_eq!(calls[0].kind, "function");
    }

    #[test]
    fn interleaved_calls_are_kept_apart() {
        let mut assembler = ToolCallAssembler::new();
        assembler.extend(&[
            ToolCallFragment::with_id(0, "call_0"),
            ToolCallFragment::with_function(0, Some("get_"), None),
            ToolCallFragment::with_id(1, "call_1"),
            ToolCallFragment::with_function(1, Some("now"), Some("{")),
            ToolCallFragment::with_function(0, Some("date"), Some("{\"tz\":")),
            ToolCallFragment::with_function(0, None, Some("\"UTC\"}")),
            ToolCallFragment::with_function(1, None, Some("}")),
        ])
        .unwrap();

        let calls = assembler.finish().unwrap();
        assert_eq!(calls[0].function.name, "get_date");
        assert_eq!(calls[0].function.arguments, r#"{"tz":"UTC"}"#);
        assert_eq!(calls[0].parse_arguments().unwrap()["tz"], "UTC");
        assert_eq!(calls[1].id, "call_1");
        assert_eq!(calls[1].function.arguments, "{}");
    }

    #[test]
    fn missing_index_is_an_error() {
        let mut assembler = ToolCallAssembler::new();
        assembler.push(&ToolCallFragment::with_id(1, "late")).unwrap();

        assert!(matches!(assembler.finish(), Err(NoteLlmError::Stream(_))));
    }

    #[test]
    fn invalid_arguments_surface_on_parse() {
        let mut assembler = ToolCallAssembler::new();
        assembler
            .push(&ToolCallFragment::with_function(0, Some("f"), Some("{\"a\":")))
            .unwrap();

        let calls = assembler.finish().unwrap();
        assert!(calls[0].parse_arguments().is_err());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":18446744073709551615,"id":"x"}]}}]}"#,
        )
        .unwrap();
        let fragments = chunk.choices[0].delta.tool_calls.as_ref().unwrap();

        let mut assembler = ToolCallAssembler::new();
        let err = assembler.extend(fragments).unwrap_err();
        assert!(matches!(err, NoteLlmError::Stream(message) if message.contains("exceeds")));
        assert!(assembler.is_empty());

        assert!(assembler.push(&ToolCallFragment::with_id(MAX_TOOL_CALLS, "x")).is_err());
        assembler
            .push(&ToolCallFragment::with_id(MAX_TOOL_CALLS - 1, "last"))
            .unwrap();
        assert_eq!(assembler.fragment_count(), 1);
    }

    #[test]
    fn empty_assembler_yields_no_calls() {
        let assembler = ToolCallAssembler::new();
        assert!(assembler.is_empty());
        assert!(assembler.finish().unwrap().is_empty());
    }
}
