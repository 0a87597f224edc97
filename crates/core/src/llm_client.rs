use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
#[cfg(test)]
use mockall::automock;
use std::time::Duration;
use tracing::debug;

/// Builds a provider client that makes exactly one attempt per call and gives up
/// after `timeout`.
///
/// async-openai retries 5xx and 429 responses by default; a zero elapsed-time
/// budget turns that off.
pub fn provider_client(
    config: OpenAIConfig,
    timeout: Duration,
) -> reqwest::Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;
    let single_attempt = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();
    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(single_attempt))
}

/// A generic client that produces one reply for one user utterance.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Makes a single, non-streaming call and returns the trimmed reply text.
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String>;
}

/// An implementation of `GenerationClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `client` - A client for the service, usually from [`provider_client`].
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o").
    /// * `temperature` - Sampling temperature for the reply.
    /// * `max_tokens` - Upper bound on the completion length.
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            model,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl GenerationClient for OpenAICompatibleClient {
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_text)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;
        debug!(model = %self.model, usage = ?response.usage, "Chat completion received");

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .context("No content in LLM response")?;

        Ok(answer.trim().to_string())
    }
}
