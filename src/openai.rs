//! Shared OpenAI client construction.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Timeout for chat completion requests.
const CHAT_TIMEOUT_SECS: u64 = 120;

/// Timeout for audio transcription requests. Uploading and transcribing a
/// 15-minute segment can legitimately take a while; hung connections
/// should not.
const AUDIO_TIMEOUT_SECS: u64 = 300;

/// Client for chat completion calls.
pub fn chat_client() -> Client<OpenAIConfig> {
    client_with_timeout(Duration::from_secs(CHAT_TIMEOUT_SECS))
}

/// Client for transcription calls, with a longer timeout for uploads.
pub fn audio_client() -> Client<OpenAIConfig> {
    client_with_timeout(Duration::from_secs(AUDIO_TIMEOUT_SECS))
}

fn client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}
