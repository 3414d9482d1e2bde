//! Talking to the OpenAI-compatible model server.

pub mod chat;
pub mod http;
pub mod probe;
pub mod request;

pub use crate::config::options::CHAT_COMPLETIONS_PATH;
pub use chat::{open_chat_stream, ChatEventStream};
pub use probe::{
    check_server_status, models_url, probe_models, ProbeResult, ServerCheck, ServerStatus,
    MODEL_PROBE_TIMEOUT, SERVER_CHECK_TIMEOUT,
};
pub use request::{build_request_body, is_reasoning_model, merge_extra_config, ToolAttachment};
