//! Error types for NoteLLM.

pub mod unified;

pub use unified::ErrorCategory;

use thiserror::Error;

/// Primary error type for all NoteLLM operations.
#[derive(Error, Debug)]
pub enum NoteLlmError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Document changed while the reply was streaming")]
    ContextChanged,

    #[error("Reply stopped")]
    ForcedStop,

    #[error("Stream parse failed {failures} times in a row")]
    Parse { failures: u32 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status} {status_text}: {body}")]
    Api {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Tool execution error: {tool_name} - {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Editor error: {0}")]
    Editor(String),
}

impl NoteLlmError {
    /// Create an HTTP error from a non-OK response.
    pub fn api(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::ContextChanged => ErrorCategory::ContextChanged,
            Self::ForcedStop => ErrorCategory::Stopped,
            Self::Parse { .. } | Self::Serialization(_) => ErrorCategory::Parse,
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Forced stops unwind without anything being shown to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::ForcedStop)
    }

    /// Whether a network failure looks like a refused connection or a CORS
    /// rejection rather than an ordinary request failure.
    pub fn is_cors_like(&self) -> bool {
        match self {
            Self::Network(e) => e.is_connect() || e.is_request() && e.status().is_none(),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, NoteLlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_status_text_and_body() {
        let err = NoteLlmError::api(404, "Not Found", "{\"error\":\"nope\"}");
        assert_eq!(
            err.to_string(),
            "HTTP error 404 Not Found: {\"error\":\"nope\"}"
        );
        assert_eq!(err.category(), ErrorCategory::Api);
    }

    #[test]
    fn status_codes_map_to_categories() {
        assert_eq!(
            NoteLlmError::api(401, "Unauthorized", "").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            NoteLlmError::api(429, "Too Many Requests", "").category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            NoteLlmError::api(503, "Service Unavailable", "").category(),
            ErrorCategory::Server
        );
    }

    #[test]
    fn only_forced_stop_is_silent() {
        assert!(NoteLlmError::ForcedStop.is_silent());
        assert!(!NoteLlmError::ContextChanged.is_silent());
        assert!(!NoteLlmError::Parse { failures: 5 }.is_silent());
        assert!(!NoteLlmError::Configuration("x".into()).is_silent());
    }

    #[test]
    fn session_errors_have_their_own_categories() {
        assert_eq!(
            NoteLlmError::Configuration("LLM url, key or model is empty!".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(NoteLlmError::ContextChanged.category(), ErrorCategory::ContextChanged);
        assert_eq!(NoteLlmError::tool("search", "down").category(), ErrorCategory::ToolExecution);
        assert_eq!(NoteLlmError::Stream("bad".into()).category(), ErrorCategory::Unknown);
    }
}
