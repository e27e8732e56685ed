//! Usage and cost accounting for a single run.
//!
//! A `UsageRecord` is created at run start, shared with every collaborator
//! that makes billable calls, and finalized into a serializable
//! `UsageSummary` for the report. Counters are atomic so concurrent map
//! calls can record usage without locking.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Whisper API price per audio minute, in USD.
const WHISPER_PER_MINUTE: f64 = 0.006;

/// Chat completion pricing per 1K tokens (prompt, completion), in USD.
fn chat_pricing(model: &str) -> (f64, f64) {
    match model {
        "gpt-3.5-turbo" => (0.0015, 0.002),
        // 16k context and everything else billed at the larger rate.
        _ => (0.003, 0.004),
    }
}

/// Accumulated usage counters for one run.
///
/// Monotonically increasing while the run is live. Every model call adds
/// its returned token counts, including calls that only succeed after
/// retries; audio duration is recorded once by the transcription step.
#[derive(Debug, Default)]
pub struct UsageRecord {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    audio_seconds: AtomicU64,
}

impl UsageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the token usage returned by one chat completion call.
    pub fn add_completion(&self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens.fetch_add(prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(completion_tokens, Ordering::Relaxed);
    }

    /// Record transcribed audio duration.
    pub fn add_audio_seconds(&self, seconds: u64) {
        self.audio_seconds.fetch_add(seconds, Ordering::Relaxed);
    }

    pub fn prompt_tokens(&self) -> u64 {
        self.prompt_tokens.load(Ordering::Relaxed)
    }

    pub fn completion_tokens(&self) -> u64 {
        self.completion_tokens.load(Ordering::Relaxed)
    }

    /// Audio duration in minutes, rounded up like the billing meter.
    pub fn audio_minutes(&self) -> u64 {
        self.audio_seconds.load(Ordering::Relaxed).div_ceil(60)
    }

    /// Finalize the counters into a report-ready summary.
    pub fn summarize(&self, audio_model: &str, text_model: &str) -> UsageSummary {
        let prompt_tokens = self.prompt_tokens();
        let completion_tokens = self.completion_tokens();
        let audio_minutes = self.audio_minutes();

        let (prompt_rate, completion_rate) = chat_pricing(text_model);
        let text_cost = (prompt_tokens as f64 / 1000.0) * prompt_rate
            + (completion_tokens as f64 / 1000.0) * completion_rate;
        let audio_cost = audio_minutes as f64 * WHISPER_PER_MINUTE;

        UsageSummary {
            audio_model: audio_model.to_string(),
            audio_minutes,
            audio_cost,
            text_model: text_model.to_string(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            text_cost,
            total_cost: audio_cost + text_cost,
        }
    }
}

/// Finalized usage figures, serialized into the exported report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub audio_model: String,
    pub audio_minutes: u64,
    pub audio_cost: f64,
    pub text_model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub text_cost: f64,
    pub total_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_accumulate() {
        let usage = UsageRecord::new();
        usage.add_completion(10, 20);
        usage.add_completion(5, 7);
        assert_eq!(usage.prompt_tokens(), 15);
        assert_eq!(usage.completion_tokens(), 27);
    }

    #[test]
    fn test_audio_minutes_round_up() {
        let usage = UsageRecord::new();
        usage.add_audio_seconds(61);
        assert_eq!(usage.audio_minutes(), 2);
    }

    #[test]
    fn test_summary_totals_and_cost() {
        let usage = UsageRecord::new();
        usage.add_completion(1000, 500);
        usage.add_audio_seconds(600);

        let summary = usage.summarize("whisper-1", "gpt-3.5-turbo");
        assert_eq!(summary.total_tokens, 1500);
        assert_eq!(summary.audio_minutes, 10);
        assert!((summary.audio_cost - 0.06).abs() < 1e-9);
        assert!((summary.text_cost - (0.0015 + 0.001)).abs() < 1e-9);
        assert!((summary.total_cost - (summary.audio_cost + summary.text_cost)).abs() < 1e-9);
    }

    #[test]
    fn test_sixteen_k_model_uses_larger_rate() {
        let usage = UsageRecord::new();
        usage.add_completion(1000, 1000);
        let summary = usage.summarize("whisper-1", "gpt-3.5-turbo-16k");
        assert!((summary.text_cost - 0.007).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let usage = Arc::new(UsageRecord::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let usage = usage.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    usage.add_completion(1, 2);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(usage.prompt_tokens(), 1600);
        assert_eq!(usage.completion_tokens(), 3200);
    }
}
