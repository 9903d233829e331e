pub mod client;
pub mod inferrer;

use std::fmt;

use crate::model::config::LlmConfig;

pub use client::LlmClient;
pub use inferrer::ModelInferrer;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no LLM API key configured")]
    NotConfigured,
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM response had no text")]
    EmptyResponse,
    #[error("malformed LLM response: {0}")]
    Malformed(String),
}

/// Something that turns a prompt into text
pub trait TextModel: Send + Sync {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// Provider settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    OpenRouter,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Provider> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Some(Provider::Anthropic),
            "openai" => Some(Provider::OpenAi),
            "openrouter" => Some(Provider::OpenRouter),
            _ => None,
        }
    }

    /// Guess the provider from the key's prefix
    pub fn detect(api_key: &str) -> Provider {
        if api_key.starts_with("sk-ant-") {
            Provider::Anthropic
        } else if api_key.starts_with("sk-or-v1-") {
            Provider::OpenRouter
        } else if api_key.starts_with("sk-") {
            Provider::OpenAi
        } else {
            Provider::OpenRouter
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-5-20250929",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::OpenRouter => "anthropic/claude-sonnet-4-5",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
        };
        write!(f, "{s}")
    }
}

/// Resolved provider, key and model
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl LlmSettings {
    /// Resolve settings from config plus environment.
    ///
    /// The key comes from the configured `api_key_env` variable, then
    /// `LLM_API_KEY`, then `OPENROUTER_API_KEY`. `env` looks a variable up.
    pub fn resolve(
        config: &LlmConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LlmSettings, LlmError> {
        let lookup = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(lookup)
            .or_else(|| lookup("LLM_API_KEY"))
            .or_else(|| lookup("OPENROUTER_API_KEY"))
            .ok_or(LlmError::NotConfigured)?;

        let provider = match config.provider.as_deref() {
            Some(name) => Provider::parse(name).unwrap_or_else(|| {
                tracing::warn!(provider = name, "unknown LLM provider, using openrouter");
                Provider::OpenRouter
            }),
            None => Provider::detect(&api_key),
        };
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(LlmSettings {
            provider,
            api_key,
            model,
            timeout_secs: config.timeout_secs,
            max_tokens: config.max_tokens,
        })
    }

    pub fn from_env(config: &LlmConfig) -> Result<LlmSettings, LlmError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// The outermost `{...}` in a model reply, ignoring code fences
pub fn extract_json_object(text: &str) -> Option<String> {
    let stripped = strip_fences(text);
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    (end > start).then(|| stripped[start..=end].to_string())
}

/// The outermost `[...]` in a model reply, ignoring code fences
pub fn extract_json_array(text: &str) -> Option<String> {
    let stripped = strip_fences(text);
    let start = stripped.find('[')?;
    let end = stripped.rfind(']')?;
    (end > start).then(|| stripped[start..=end].to_string())
}
