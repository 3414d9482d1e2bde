//! Core types for NoteLLM.

pub mod message;
pub mod stream;
pub mod tool;

pub use message::*;
pub use stream::*;
pub use tool::*;
