use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{LlmError, LlmSettings, Provider, TextModel};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request body shared by the Anthropic messages API and the
/// OpenAI-compatible chat completions APIs
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking HTTP client for the configured provider.
///
/// Must be built outside an async runtime; call it from blocking threads.
#[derive(Debug)]
pub struct LlmClient {
    settings: LlmSettings,
    http: reqwest::blocking::Client,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<LlmClient, LlmError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        tracing::info!(provider = %settings.provider, model = %settings.model, "LLM client ready");
        Ok(LlmClient { settings, http })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }
}

impl TextModel for LlmClient {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let settings = &self.settings;
        let body = CompletionRequest {
            model: &settings.model,
            max_tokens: max_tokens.min(settings.max_tokens),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self.http.post(settings.provider.endpoint()).json(&body);
        let request = match settings.provider {
            Provider::Anthropic => request
                .header("x-api-key", &settings.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Provider::OpenAi | Provider::OpenRouter => request.bearer_auth(&settings.api_key),
        };

        tracing::debug!(provider = %settings.provider, prompt_len = prompt.len(), "LLM request");
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = match settings.provider {
            Provider::Anthropic => response
                .json::<AnthropicResponse>()?
                .content
                .into_iter()
                .find_map(|b| b.text),
            Provider::OpenAi | Provider::OpenRouter => response
                .json::<ChatResponse>()?
                .choices
                .into_iter()
                .find_map(|c| c.message.content),
        };
        text.filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
