//! Locale-keyed user-facing text.
//!
//! Lookup falls back to English for unknown locales.

/// Texts for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texts {
    pub prompt_chat: &'static str,
    pub err_cors: &'static str,
    pub err_llm_conf: &'static str,
    pub err_note_changed: &'static str,
    pub err_wrong: &'static str,
}

const EN: Texts = Texts {
    prompt_chat: "You are helpful assistant. You are operating in a wiki environment. \
Your task is to respond to the final paragraph in a conversational manner based on the \
information provided by the user previously. Please note that you should not ask additional \
follow-up questions after your response.",
    err_cors: "This might be (1) network error, or (2) LLM server CORS.",
    err_llm_conf: "LLM url, key or model is empty!",
    err_note_changed: "Note changed unexpectedly.",
    err_wrong: "Sorry, something went wrong. Please check plugin logs for detail.",
};

const ZH_CN: Texts = Texts {
    prompt_chat: "你是用户的助手。你的任务是基于用户前文提供的信息，回复最后的段落。请注意，回复完成之后不要额外追问。",
    err_cors: "可能原因： (1) 网络错误； (2) 大模型服务器 CORS 配置禁止跨域.",
    err_llm_conf: "LLM配置错误，请检查 url, key 和 model 是否正确。",
    err_note_changed: "笔记似乎被切换了，输出强制中断。",
    err_wrong: "未知错误，请检查插件日志了解详细信息。",
};

impl Texts {
    /// Texts for a locale tag such as `en` or `zh_CN`.
    pub fn for_locale(locale: &str) -> &'static Texts {
        match locale {
            "zh_CN" | "zh-CN" | "zh" => &ZH_CN,
            _ => &EN,
        }
    }
}
