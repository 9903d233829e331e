use serde::{Deserialize, Serialize};

/// Configuration from daybook.toml (every table optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Catch-all project for tasks no rule could place
    #[serde(default = "default_fallback_project")]
    pub fallback_project: String,
    /// Archive promoted capture lines once more than this many pile up
    #[serde(default = "default_capture_archive_threshold")]
    pub capture_archive_threshold: usize,
    /// How many promoted capture lines stay in tasks.md after archiving
    #[serde(default = "default_capture_archive_keep")]
    pub capture_archive_keep: usize,
    /// Inbox date sections older than this many days are archived
    #[serde(default = "default_inbox_retention_days")]
    pub inbox_retention_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            fallback_project: default_fallback_project(),
            capture_archive_threshold: default_capture_archive_threshold(),
            capture_archive_keep: default_capture_archive_keep(),
            inbox_retention_days: default_inbox_retention_days(),
        }
    }
}

fn default_fallback_project() -> String {
    "others".to_string()
}

fn default_capture_archive_threshold() -> usize {
    50
}

fn default_capture_archive_keep() -> usize {
    20
}

fn default_inbox_retention_days() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `anthropic`, `openai` or `openrouter`; detected from the key when unset
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            provider: None,
            model: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_tokens() -> u32 {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sync.fallback_project, "others");
        assert_eq!(config.sync.capture_archive_threshold, 50);
        assert_eq!(config.sync.capture_archive_keep, 20);
        assert_eq!(config.sync.inbox_retention_days, 30);
        assert_eq!(config.llm.timeout_secs, 20);
        assert!(config.llm.provider.is_none());
    }

    #[test]
    fn partial_tables_fill_defaults() {
        let config: Config = toml::from_str(
            r#"
[server]
port = 8080

[sync]
fallback_project = "misc"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.sync.fallback_project, "misc");
        assert_eq!(config.sync.capture_archive_keep, 20);
    }
}
