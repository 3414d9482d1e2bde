//! Utility modules: text helpers, timeout.

pub mod text;
pub mod timeout;
