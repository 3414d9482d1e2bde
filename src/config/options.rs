//! Resolution of the active model slot from settings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::store::{SettingValue, SettingsStore};
use super::McpServerList;
use crate::error::{NoteLlmError, Result};

pub const DEFAULT_TEMPERATURE: f64 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_SERVER_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Number of model slots a user can configure.
pub const MODEL_SLOTS: u8 = 3;

/// Setting keys belonging to one model slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotKeys {
    pub slot: u8,
    pub model: String,
    pub server_type: String,
    pub server_url: String,
    pub key: String,
    pub key_backup: String,
    pub extra: String,
    pub mcp: String,
}

impl SlotKeys {
    /// Keys for slot `n`; anything outside 2..=3 maps to slot 1.
    pub fn for_slot(n: u8) -> Self {
        let (slot, suffix) = match n {
            2 => (2, "2"),
            3 => (3, "3"),
            _ => (1, ""),
        };
        Self {
            slot,
            model: format!("llmModel{suffix}"),
            server_type: format!("llmServerType{suffix}"),
            server_url: format!("llmServerUrl{suffix}"),
            key: format!("llmKey{suffix}"),
            key_backup: format!("llmKeyBak{suffix}"),
            extra: format!("llmExtra{suffix}"),
            mcp: format!("llmMcp{suffix}"),
        }
    }
}

/// Hosted providers with a fixed base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum ServerType {
    #[strum(serialize = "OpenAI-API-Compatible")]
    Custom,
    OpenAI,
    Anthropic,
    #[strum(serialize = "Google-Gemini")]
    Gemini,
    Grok,
    DeepSeek,
    #[strum(serialize = "Dashscope(Qwen)")]
    Dashscope,
    #[strum(serialize = "Volcengine(Doubao)")]
    Volcengine,
    ZhiPu,
    MiniMax,
    Moonshot,
    LingyiWanwu,
    #[strum(serialize = "Xiaomi(MiMo)")]
    Xiaomi,
    OpenRouter,
}

impl ServerType {
    /// Map the numeric setting value. Unknown numbers yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Custom,
            1 => Self::OpenAI,
            2 => Self::Anthropic,
            3 => Self::Gemini,
            4 => Self::Grok,
            20 => Self::DeepSeek,
            21 => Self::Dashscope,
            22 => Self::Volcengine,
            23 => Self::ZhiPu,
            24 => Self::MiniMax,
            25 => Self::Moonshot,
            26 => Self::LingyiWanwu,
            50 => Self::Xiaomi,
            90 => Self::OpenRouter,
            _ => return None,
        })
    }

    /// Base URL of the provider, `None` for custom servers.
    pub fn base_url(self) -> Option<&'static str> {
        match self {
            Self::Custom => None,
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Anthropic => Some("https://api.anthropic.com/v1"),
            Self::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
            Self::Grok => Some("https://api.x.ai/v1"),
            Self::DeepSeek => Some("https://api.deepseek.com/v1"),
            Self::Dashscope => Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
            Self::Volcengine => Some("https://ark.cn-beijing.volces.com/api/v3"),
            Self::ZhiPu => Some("https://open.bigmodel.cn/api/paas/v4"),
            Self::MiniMax => Some("https://api.minimax.chat/v1"),
            Self::Moonshot => Some("https://api.moonshot.cn/v1"),
            Self::LingyiWanwu => Some("https://api.lingyiwanwu.com/v1"),
            Self::Xiaomi => Some("https://api.xiaomimimo.com/v1"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
        }
    }
}

/// Full chat-completions URL for a slot.
///
/// A known server type wins over the custom URL. Custom URLs get the
/// completions path appended unless they already end with it.
pub fn resolve_chat_url(server_type: Option<ServerType>, custom_url: &str) -> String {
    if let Some(base) = server_type.and_then(ServerType::base_url) {
        return format!("{base}{CHAT_COMPLETIONS_PATH}");
    }
    if custom_url.ends_with(CHAT_COMPLETIONS_PATH) {
        custom_url.to_string()
    } else if custom_url.ends_with('/') {
        format!("{custom_url}chat/completions")
    } else {
        format!("{custom_url}{CHAT_COMPLETIONS_PATH}")
    }
}

/// How the editor view follows the streamed text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    None,
    #[default]
    Desktop,
    Mobile,
}

impl ScrollMode {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Desktop,
            2 => Self::Mobile,
            _ => Self::None,
        }
    }
}

/// Tool-use mode selected per model slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum McpMode {
    #[default]
    Off,
    /// Ordinary tool calling.
    Mcp,
    /// One successful delegated call ends tool use for the session.
    Agent,
}

impl McpMode {
    pub fn from_code(code: i64) -> Self {
        match code {
            20 => Self::Agent,
            c if c > 0 => Self::Mcp,
            _ => Self::Off,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Self::Off
    }
}

/// Everything a reply session needs from settings, resolved once per round.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmOptions {
    pub slot: u8,
    pub model: String,
    pub url: String,
    pub key: String,
    pub extra_config: String,
    pub mcp_mode: McpMode,
    pub scroll: ScrollMode,
    /// Chat transcripts are split into turns.
    pub advanced_chat: bool,
    pub hide_thinking: bool,
    pub chat_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub mcp_servers: McpServerList,
}

impl LlmOptions {
    /// Read the selected slot and shared settings.
    ///
    /// Also runs the API-key backup/restore for the slot.
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let slot = get_i64(store, "llmSelect").await?.unwrap_or(1);
        let keys = SlotKeys::for_slot(u8::try_from(slot).unwrap_or(1));

        let model = get_text(store, &keys.model)
            .await?
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
            .trim()
            .to_string();
        let server_type = get_i64(store, &keys.server_type)
            .await?
            .and_then(ServerType::from_code);
        let custom_url = get_text(store, &keys.server_url)
            .await?
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let url = resolve_chat_url(server_type, &custom_url);
        let key = backup_api_key(store, keys.slot).await?;

        let temperature = get_f64(store, "llmTemperature")
            .await?
            .filter(|t| t.is_finite())
            .unwrap_or(DEFAULT_TEMPERATURE);
        let max_tokens = get_i64(store, "llmMaxTokens")
            .await?
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        Ok(Self {
            slot: keys.slot,
            model,
            url,
            key,
            extra_config: get_text(store, &keys.extra).await?.unwrap_or_default(),
            mcp_mode: McpMode::from_code(get_i64(store, &keys.mcp).await?.unwrap_or(0)),
            scroll: ScrollMode::from_code(get_i64(store, "llmScrollType").await?.unwrap_or(1)),
            advanced_chat: get_i64(store, "llmChatType").await? == Some(1),
            hide_thinking: get_i64(store, "llmChatSkipThink").await? == Some(1),
            chat_prompt: get_text(store, "llmChatPrompt").await?.unwrap_or_default(),
            temperature,
            max_tokens,
            mcp_servers: McpServerList::load(store).await?,
        })
    }

    /// Fail with a configuration error if model, URL or key is blank.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() || self.url.trim().is_empty() || self.key.trim().is_empty() {
            return Err(NoteLlmError::Configuration(
                "model, url and key must all be set".into(),
            ));
        }
        Ok(())
    }

    /// Tools are offered when the slot enables them and a server is configured.
    pub fn tools_configured(&self) -> bool {
        self.mcp_mode.is_enabled() && !self.mcp_servers.is_empty()
    }
}

/// Keep the slot's API key and its backup in sync and return the key.
///
/// A blank key is restored from a non-blank backup; a non-blank key is
/// written to the backup.
pub async fn backup_api_key(store: &dyn SettingsStore, slot: u8) -> Result<String> {
    let keys = SlotKeys::for_slot(slot);
    let key = get_text(store, &keys.key).await?.unwrap_or_default();
    let key = key.trim();

    if key.is_empty() {
        let backup = get_text(store, &keys.key_backup).await?.unwrap_or_default();
        let backup = backup.trim();
        if backup.is_empty() {
            return Ok(String::new());
        }
        tracing::info!(slot = keys.slot, "restoring api key from backup");
        store.set(&keys.key, SettingValue::from(backup)).await?;
        return Ok(backup.to_string());
    }

    store.set(&keys.key_backup, SettingValue::from(key)).await?;
    Ok(key.to_string())
}

pub(crate) async fn get_text(store: &dyn SettingsStore, key: &str) -> Result<Option<String>> {
    Ok(store.get(key).await?.map(|v| v.as_text()))
}

pub(crate) async fn get_i64(store: &dyn SettingsStore, key: &str) -> Result<Option<i64>> {
    Ok(store.get(key).await?.and_then(|v| v.as_i64()))
}

async fn get_f64(store: &dyn SettingsStore, key: &str) -> Result<Option<f64>> {
    Ok(store.get(key).await?.and_then(|v| v.as_f64()))
}
