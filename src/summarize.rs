//! Map-reduce summarization over a chunked transcript.
//!
//! The map pass summarizes every chunk independently; the reduce pass
//! re-packs the partial summaries into budget-sized groups and merges each
//! group with a combine prompt, repeating until exactly one summary
//! remains. Reduction is an explicit loop with a shrink check rather than
//! recursion, so a pass that fails to shrink the list surfaces as
//! `ReduceNotConverging` instead of looping forever.

use crate::chunking::{chunk_transcript, pack_units, Chunk};
use crate::config::Prompts;
use crate::error::{ReferatError, Result};
use crate::llm::LanguageModel;
use crate::tokens::TokenEstimator;
use crate::usage::UsageRecord;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A partial or final summary with its estimated token count.
#[derive(Debug, Clone)]
pub struct Summary {
    pub text: String,
    pub tokens: usize,
}

/// Final result of a summarization run.
///
/// `chunks_skipped` makes partial map coverage visible: a run with skipped
/// chunks still completes, but the caller can report the gap.
#[derive(Debug, Clone)]
pub struct MeetingSummary {
    /// The final merged summary text.
    pub text: String,
    /// Number of chunks the transcript was split into.
    pub chunks_total: usize,
    /// Chunks whose summarization calls exhausted their retries.
    pub chunks_skipped: usize,
    /// Number of reduce passes needed to converge.
    pub reduce_passes: usize,
}

/// Token-budgeted map-reduce summarizer.
pub struct MapReduceSummarizer {
    model: Arc<dyn LanguageModel>,
    estimator: Arc<dyn TokenEstimator>,
    prompts: Prompts,
    max_input_tokens: usize,
    max_concurrent: usize,
    usage: Arc<UsageRecord>,
}

impl MapReduceSummarizer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        estimator: Arc<dyn TokenEstimator>,
        prompts: Prompts,
        max_input_tokens: usize,
        max_concurrent: usize,
        usage: Arc<UsageRecord>,
    ) -> Self {
        Self {
            model,
            estimator,
            prompts,
            max_input_tokens,
            max_concurrent: max_concurrent.max(1),
            usage,
        }
    }

    /// Summarize a full transcript down to a single summary.
    #[instrument(skip_all, fields(transcript_chars = transcript.len()))]
    pub async fn summarize(&self, transcript: &str) -> Result<MeetingSummary> {
        let chunks = chunk_transcript(transcript, self.max_input_tokens, &*self.estimator)?;
        let chunks_total = chunks.len();
        info!("Split transcript into {} chunks", chunks_total);

        let (mut summaries, chunks_skipped) = self.map_pass(chunks).await?;

        let mut reduce_passes = 0;
        while summaries.len() > 1 {
            let counts: Vec<usize> = summaries.iter().map(|s| s.tokens).collect();
            let groups = pack_units(&counts, self.max_input_tokens);

            if groups.len() >= summaries.len() {
                return Err(ReferatError::ReduceNotConverging(
                    summaries.len(),
                    groups.len(),
                ));
            }

            summaries = self.reduce_pass(&summaries, &groups).await?;
            reduce_passes += 1;
            info!(
                "Reduce pass {} complete: {} summaries remain",
                reduce_passes,
                summaries.len()
            );
        }

        let final_summary = summaries
            .pop()
            .ok_or_else(|| {
                ReferatError::SummarizationFailed(
                    "no summaries survived the map pass".to_string(),
                )
            })?;

        Ok(MeetingSummary {
            text: final_summary.text,
            chunks_total,
            chunks_skipped,
            reduce_passes,
        })
    }

    /// Summarize every chunk, preserving chunk order in the output.
    ///
    /// Calls run concurrently; completion order is irrelevant because
    /// results are reassembled by chunk index. A chunk whose call fails
    /// after retries is skipped, not fatal; only a fully failed pass is.
    async fn map_pass(&self, chunks: Vec<Chunk>) -> Result<(Vec<Summary>, usize)> {
        let total = chunks.len();
        let mut results: Vec<(usize, Result<Summary>)> = Vec::with_capacity(total);

        let mut stream = stream::iter(chunks.into_iter())
            .map(|chunk| async move {
                let result = self.summarize_chunk(&chunk).await;
                (chunk.order, result)
            })
            .buffer_unordered(self.max_concurrent);

        while let Some(entry) = stream.next().await {
            results.push(entry);
        }
        drop(stream);

        results.sort_by_key(|(order, _)| *order);

        let mut summaries = Vec::with_capacity(total);
        let mut skipped = 0;
        for (order, result) in results {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!("Skipping chunk {}: {}", order, e);
                    skipped += 1;
                }
            }
        }

        if summaries.is_empty() {
            return Err(ReferatError::SummarizationFailed(format!(
                "all {} chunk summarization calls failed",
                total
            )));
        }

        if skipped > 0 {
            warn!(
                "Map pass finished with {} of {} chunks skipped",
                skipped, total
            );
        }

        Ok((summaries, skipped))
    }

    /// Merge each packed group into one summary, preserving group order.
    ///
    /// Unlike the map pass, a failed merge here would silently drop a
    /// whole group of content, so merge failures abort the run.
    async fn reduce_pass(
        &self,
        summaries: &[Summary],
        groups: &[std::ops::Range<usize>],
    ) -> Result<Vec<Summary>> {
        let mut results: Vec<(usize, Summary)> = Vec::with_capacity(groups.len());

        let mut stream = stream::iter(groups.iter().cloned().enumerate())
            .map(|(idx, range)| async move {
                let result = self.merge_group(&summaries[range]).await;
                (idx, result)
            })
            .buffer_unordered(self.max_concurrent);

        while let Some((idx, result)) = stream.next().await {
            match result {
                Ok(summary) => results.push((idx, summary)),
                Err(e) => return Err(e),
            }
        }
        drop(stream);

        results.sort_by_key(|(idx, _)| *idx);
        Ok(results.into_iter().map(|(_, s)| s).collect())
    }

    /// One map call: summarize a single transcript chunk.
    async fn summarize_chunk(&self, chunk: &Chunk) -> Result<Summary> {
        debug!("Summarizing chunk {} ({} tokens)", chunk.order, chunk.tokens);

        let mut vars = HashMap::new();
        vars.insert("chunk".to_string(), chunk.text.clone());
        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.summarize.user, &vars);

        self.call_model(&self.prompts.summarize.system, &user_prompt)
            .await
    }

    /// One reduce call: combine a group of partial summaries.
    async fn merge_group(&self, group: &[Summary]) -> Result<Summary> {
        // A lone summary still goes through the model: if it was packed
        // alone because it exceeds the budget, re-summarizing is what
        // shrinks it enough for the next pass to converge.
        let joined = group
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut vars = HashMap::new();
        vars.insert("summaries".to_string(), joined);
        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.combine.user, &vars);

        self.call_model(&self.prompts.combine.system, &user_prompt)
            .await
    }

    async fn call_model(&self, system_prompt: &str, user_prompt: &str) -> Result<Summary> {
        let completion = self.model.complete(system_prompt, user_prompt).await?;
        self.usage
            .add_completion(completion.prompt_tokens, completion.completion_tokens);

        Ok(Summary {
            tokens: self.estimator.estimate(&completion.text),
            text: completion.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Completion;
    use crate::tokens::HeuristicEstimator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted model: returns a fixed reply, fails on a marker substring.
    struct ScriptedModel {
        reply: String,
        fail_marker: Option<String>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail_marker: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(reply: &str, marker: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail_marker: Some(marker.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(marker) = &self.fail_marker {
                if prompt.contains(marker) {
                    return Err(ReferatError::ModelCallFailed("scripted failure".into()));
                }
            }
            Ok(Completion {
                text: self.reply.clone(),
                prompt_tokens: 7,
                completion_tokens: 3,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn summarizer(
        model: Arc<ScriptedModel>,
        budget: usize,
        usage: Arc<UsageRecord>,
    ) -> MapReduceSummarizer {
        MapReduceSummarizer::new(
            model,
            Arc::new(HeuristicEstimator::new()),
            Prompts::default(),
            budget,
            2,
            usage,
        )
    }

    /// Five sentences of 25 tokens each; with a 30-token budget each lands
    /// in its own chunk.
    fn five_chunk_transcript(markers: &[&str]) -> String {
        (0..5)
            .map(|i| {
                let marker = markers.get(i).copied().unwrap_or("");
                let filler = "a".repeat(99 - marker.len());
                format!("{}{}.", marker, filler)
            })
            .collect()
    }

    #[test]
    fn test_five_chunk_transcript_shape() {
        let text = five_chunk_transcript(&[]);
        let chunks = chunk_transcript(&text, 30, &HeuristicEstimator::new()).unwrap();
        assert_eq!(chunks.len(), 5);
    }

    #[tokio::test]
    async fn test_single_chunk_needs_no_reduce() {
        let model = Arc::new(ScriptedModel::new("They agreed to ship v2."));
        let usage = Arc::new(UsageRecord::new());
        let s = summarizer(model.clone(), 1000, usage);

        let result = s
            .summarize("Alice: Let's ship v2. Bob: I'll write tests.")
            .await
            .unwrap();

        assert_eq!(result.text, "They agreed to ship v2.");
        assert_eq!(result.chunks_total, 1);
        assert_eq!(result.chunks_skipped, 0);
        assert_eq!(result.reduce_passes, 0);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_five_chunks_reduce_in_two_passes() {
        // Replies estimate to 10 tokens, so a 30-token budget packs three
        // summaries per reduce group: 5 -> 2 (3+2) -> 1.
        let model = Arc::new(ScriptedModel::new(&"x".repeat(40)));
        let usage = Arc::new(UsageRecord::new());
        let s = summarizer(model.clone(), 30, usage.clone());

        let result = s.summarize(&five_chunk_transcript(&[])).await.unwrap();

        assert_eq!(result.chunks_total, 5);
        assert_eq!(result.reduce_passes, 2);
        // 5 map calls + 2 first-pass merges + 1 final merge
        assert_eq!(model.calls(), 8);
        // Usage reflects every call actually made.
        assert_eq!(usage.prompt_tokens(), 8 * 7);
        assert_eq!(usage.completion_tokens(), 8 * 3);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped_not_fatal() {
        let model = Arc::new(ScriptedModel::failing_on(&"x".repeat(40), "FAILME"));
        let usage = Arc::new(UsageRecord::new());
        let s = summarizer(model.clone(), 30, usage);

        let result = s
            .summarize(&five_chunk_transcript(&["", "", "FAILME", "", ""]))
            .await
            .unwrap();

        assert_eq!(result.chunks_total, 5);
        assert_eq!(result.chunks_skipped, 1);
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn test_all_chunks_failing_is_fatal() {
        let model = Arc::new(ScriptedModel::failing_on("unused", "a"));
        let usage = Arc::new(UsageRecord::new());
        let s = summarizer(model, 30, usage);

        let err = s.summarize(&five_chunk_transcript(&[])).await.unwrap_err();
        assert!(matches!(err, ReferatError::SummarizationFailed(_)));
    }

    #[tokio::test]
    async fn test_oversized_replies_fail_to_converge() {
        // Replies estimate to 50 tokens against a 30-token budget, so the
        // reduce pass can only form singleton groups and must bail out.
        let model = Arc::new(ScriptedModel::new(&"x".repeat(200)));
        let usage = Arc::new(UsageRecord::new());
        let s = summarizer(model, 30, usage);

        let err = s.summarize(&five_chunk_transcript(&[])).await.unwrap_err();
        assert!(matches!(err, ReferatError::ReduceNotConverging(_, _)));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_invalid_input() {
        let model = Arc::new(ScriptedModel::new("unused"));
        let usage = Arc::new(UsageRecord::new());
        let s = summarizer(model, 30, usage);

        let err = s.summarize("").await.unwrap_err();
        assert!(matches!(err, ReferatError::InvalidInput(_)));
    }
}
