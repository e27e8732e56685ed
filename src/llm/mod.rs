//! Language model collaborator for summarization calls.
//!
//! The summarizer only depends on the `LanguageModel` trait, so tests can
//! swap in scripted models and the OpenAI-backed implementation stays at
//! the edge of the crate.

mod openai_chat;

pub use openai_chat::OpenAiChat;

use crate::error::Result;
use async_trait::async_trait;

/// One completed model call: the generated text plus the token usage the
/// provider reported for it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Capability handle for a chat-style language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Issue one completion call with a system prompt and a user prompt.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<Completion>;

    /// Model identifier, used for reporting.
    fn name(&self) -> &str;
}
