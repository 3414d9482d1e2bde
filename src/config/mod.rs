//! Settings storage and model-slot resolution.
//!
//! Hosts hand the reply engine a [`SettingsStore`]. Everything the engine
//! reads from it is resolved into [`LlmOptions`] at the start of each round.

pub mod options;
pub mod servers;
pub mod store;

pub use options::{
    backup_api_key, resolve_chat_url, LlmOptions, McpMode, ScrollMode, ServerType, SlotKeys,
    MODEL_SLOTS,
};
pub use servers::{McpServer, McpServerList};
pub use store::{default_settings_path, FileSettings, MemorySettings, SettingValue, SettingsStore};
