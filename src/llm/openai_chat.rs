//! OpenAI chat completion implementation with bounded retries.

use super::{Completion, LanguageModel};
use crate::error::{ReferatError, Result};
use crate::openai::chat_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// OpenAI-backed chat model.
///
/// Transient API failures are retried with exponential backoff (base delay
/// doubling per attempt); when attempts are exhausted the call surfaces as
/// `ModelCallFailed` and the caller decides whether that is fatal.
pub struct OpenAiChat {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_completion_tokens: u32,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl OpenAiChat {
    /// Create a chat model with default retry policy (3 attempts, 2s base).
    pub fn new(model: &str) -> Self {
        Self::with_config(model, 0.1, 1000, 3, Duration::from_secs(2))
    }

    pub fn with_config(
        model: &str,
        temperature: f32,
        max_completion_tokens: u32,
        max_attempts: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self {
            client: chat_client(),
            model: model.to_string(),
            temperature,
            max_completion_tokens,
            max_attempts: max_attempts.max(1),
            retry_base_delay,
        }
    }

    async fn try_complete(&self, system_prompt: &str, prompt: &str) -> Result<Completion> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| ReferatError::ModelCallFailed(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| ReferatError::ModelCallFailed(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_completion_tokens)
            .build()
            .map_err(|e| ReferatError::ModelCallFailed(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ReferatError::OpenAI(e.to_string()))?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                ReferatError::ModelCallFailed("empty response from model".to_string())
            })?;

        let (prompt_tokens, completion_tokens) = response
            .usage
            .map(|u| (u.prompt_tokens as u64, u.completion_tokens as u64))
            .unwrap_or((0, 0));

        debug!(
            prompt_tokens,
            completion_tokens, "Completion received from {}", self.model
        );

        Ok(Completion {
            text,
            prompt_tokens,
            completion_tokens,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<Completion> {
        let mut delay = self.retry_base_delay;

        for attempt in 1..=self.max_attempts {
            match self.try_complete(system_prompt, prompt).await {
                Ok(completion) => return Ok(completion),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        "Model call failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    return Err(ReferatError::ModelCallFailed(format!(
                        "giving up after {} attempts: {}",
                        self.max_attempts, e
                    )));
                }
            }
        }

        unreachable!("retry loop always returns")
    }

    fn name(&self) -> &str {
        &self.model
    }
}
