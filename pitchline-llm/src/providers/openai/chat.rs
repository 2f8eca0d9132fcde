//! OpenAI chat completion provider

use super::client::OpenAIClient;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::providers::invalid_response;
use crate::{Completion, CompletionRequest, LlmProvider, TokenUsage};
use async_trait::async_trait;
use pitchline_core::{LlmConfig, PitchlineResult};

/// Chat completion provider for any OpenAI-compatible endpoint.
pub struct OpenAIChatProvider {
    client: OpenAIClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIChatProvider {
    /// Create a new chat provider.
    ///
    /// # Arguments
    /// * `client` - Configured HTTP client
    /// * `model` - Model name (e.g., "gpt-4o", "gpt-4o-mini")
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        let defaults = LlmConfig::default();
        Self {
            client,
            model: model.into(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: OpenAIClient::from_config(config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAIChatProvider {
    async fn complete(&self, request: &CompletionRequest) -> PitchlineResult<Completion> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.temperature)),
        };

        let response: ChatCompletionResponse =
            self.client.request("chat/completions", &body).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| invalid_response("openai", "No completion in response"))?;

        Ok(Completion {
            content,
            model: response.model.unwrap_or_else(|| self.model.clone()),
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAIChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChatProvider")
            .field("client", &self.client)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
