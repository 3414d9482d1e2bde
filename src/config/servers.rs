//! MCP server list assembled from the numbered server settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::options::get_i64;
use super::store::SettingsStore;
use crate::error::Result;

/// Number of numbered MCP server entries in settings.
pub const MCP_SERVER_SLOTS: u8 = 42;

/// One configured tool server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    pub url: String,
    /// Raw JSON object of extra request headers, may be empty.
    #[serde(default)]
    pub headers: String,
}

impl McpServer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: String::new(),
        }
    }

    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Parsed header map. Blank or malformed JSON yields no headers.
    pub fn header_map(&self) -> HashMap<String, String> {
        let raw = self.headers.trim();
        if raw.is_empty() {
            return HashMap::new();
        }
        match serde_json::from_str::<HashMap<String, serde_json::Value>>(raw) {
            Ok(map) => map
                .into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, v)
                })
                .collect(),
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "ignoring malformed mcp headers");
                HashMap::new()
            }
        }
    }
}

/// Ordered list of enabled tool servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerList {
    servers: Vec<McpServer>,
}

impl McpServerList {
    pub fn new(servers: Vec<McpServer>) -> Self {
        Self { servers }
    }

    /// Parse pipe-delimited URL and header lists. Blank URLs are skipped and
    /// missing header entries default to empty.
    pub fn parse(urls: &str, headers: &str) -> Self {
        let headers: Vec<&str> = headers.split('|').collect();
        let servers = urls
            .split('|')
            .enumerate()
            .filter(|(_, url)| !url.trim().is_empty())
            .map(|(i, url)| {
                McpServer::new(url.trim())
                    .with_headers(headers.get(i).map(|h| h.trim()).unwrap_or_default())
            })
            .collect();
        Self { servers }
    }

    /// Read `llmMcpEnabled` and the numbered `llmMcpServer_NN` entries.
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let master = get_i64(store, "llmMcpEnabled").await?.unwrap_or(10);
        if master <= 0 {
            return Ok(Self::default());
        }

        let mut servers = Vec::new();
        for n in 1..=MCP_SERVER_SLOTS {
            let nn = format!("{n:02}");
            let enabled = store
                .get(&format!("llmMcpEnabled_{nn}"))
                .await?
                .is_some_and(|v| v.as_bool());
            if !enabled {
                continue;
            }
            let url = store
                .get(&format!("llmMcpServer_{nn}"))
                .await?
                .map(|v| v.as_text())
                .unwrap_or_default();
            if url.trim().is_empty() {
                continue;
            }
            let headers = store
                .get(&format!("llmMcpHeaders_{nn}"))
                .await?
                .map(|v| v.as_text())
                .unwrap_or_default();
            servers.push(McpServer::new(url.trim()).with_headers(headers.trim()));
        }
        Ok(Self { servers })
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &McpServer> {
        self.servers.iter()
    }

    /// Pipe-joined URLs, the form hosts display.
    pub fn joined_urls(&self) -> String {
        self.servers
            .iter()
            .map(|s| s.url.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemorySettings, SettingValue};

    #[test]
    fn parse_pairs_urls_with_headers() {
        let list = McpServerList::parse(
            "http://a|http://b",
            r#"{"X-Token":"1"}|"#,
        );
        let servers: Vec<_> = list.iter().collect();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].header_map().get("X-Token").map(String::as_str), Some("1"));
        assert!(servers[1].header_map().is_empty());
    }

    #[test]
    fn parse_skips_blank_urls() {
        assert!(McpServerList::parse("", "").is_empty());
        assert_eq!(McpServerList::parse(" |http://b", "").len(), 1);
    }

    #[test]
    fn malformed_headers_are_ignored() {
        let server = McpServer::new("http://a").with_headers("{not json");
        assert!(server.header_map().is_empty());
    }

    #[tokio::test]
    async fn load_keeps_enabled_servers_in_order() {
        let store = MemorySettings::with_values([
            ("llmMcpEnabled_01", SettingValue::Bool(true)),
            ("llmMcpServer_01", "http://one".into()),
            ("llmMcpEnabled_02", SettingValue::Bool(false)),
            ("llmMcpServer_02", "http://two".into()),
            ("llmMcpEnabled_05", SettingValue::Bool(true)),
            ("llmMcpServer_05", " http://five ".into()),
            ("llmMcpHeaders_05", r#"{"a":"b"}"#.into()),
        ]);

        let list = McpServerList::load(&store).await.unwrap();

        assert_eq!(list.joined_urls(), "http://one|http://five");
    }

    #[tokio::test]
    async fn master_switch_off_disables_all_servers() {
        let store = MemorySettings::with_values([
            ("llmMcpEnabled", SettingValue::Int(0)),
            ("llmMcpEnabled_01", SettingValue::Bool(true)),
            ("llmMcpServer_01", "http://one".into()),
        ]);

        assert!(McpServerList::load(&store).await.unwrap().is_empty());
    }
}
