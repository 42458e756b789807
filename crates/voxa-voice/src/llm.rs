//! Chat-completions language model client.

use crate::config::LlmConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use voxa_types::ChatMessage;

/// Generates one reply for a conversation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// `messages` is the conversation so far, ending with the newest user
    /// turn. `system_prompt`, when present, is sent as a leading
    /// system-role message. `temperature` overrides the client default.
    /// Single attempt: errors are returned, never retried.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, VoiceError>;
}

/// Builds the message list sent to the model.
pub fn build_context(messages: &[ChatMessage], system_prompt: Option<&str>) -> Vec<ChatMessage> {
    let mut context = Vec::with_capacity(messages.len() + 1);
    if let Some(prompt) = system_prompt {
        context.push(ChatMessage::system(prompt));
    }
    context.extend_from_slice(messages);
    context
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `POST {base_url}/chat/completions` client.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;

        if config.api_key.is_empty() {
            tracing::warn!(base_url = %config.base_url, "language model configured without an API key");
        }

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, VoiceError> {
        let context = build_context(messages, system_prompt);
        let body = ChatRequest {
            model: &self.model,
            messages: &context,
            temperature: temperature.unwrap_or(self.temperature),
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, messages = context.len(), "requesting completion");

        let mut request = self.client.post(self.endpoint()).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| VoiceError::Generation(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Generation(format!(
                "LLM API error {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| VoiceError::Generation(format!("malformed response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| VoiceError::Generation("response contained no choices".to_string()))
    }
}
