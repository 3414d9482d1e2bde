//! Stream decoding: SSE lines, think/content splitting and tool-call assembly.

pub mod assembler;
pub mod sse;
pub mod think;

pub use assembler::{ToolCallAssembler, MAX_TOOL_CALLS};
pub use sse::{parse_line, sse_events, SseEvent, SseLineBuffer};
pub use think::{ThinkBlock, ThinkMarker, ThinkSplitter, ThinkStatus, Transition};
