//! Error classification.

/// Broad error category for routing user-facing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ContextChanged,
    Stopped,
    Parse,
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    ToolExecution,
    Unknown,
}

