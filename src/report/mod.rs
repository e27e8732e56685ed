//! Meeting report assembly.
//!
//! Takes the final map-reduce summary and derives the reader-facing
//! artifacts: highlights and action items, each from one more model call,
//! assembled together with usage figures into a `Report`.

mod exporter;

pub use exporter::ReportExporter;

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::summarize::MeetingSummary;
use crate::usage::{UsageRecord, UsageSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// The assembled meeting report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meeting_name: String,
    /// Final summary produced by the map-reduce pipeline.
    pub summary: String,
    /// Key points discussed, as a formatted list.
    pub highlights: String,
    /// Follow-up actions, as a formatted list.
    pub action_items: String,
    /// Number of transcript chunks the summary was built from.
    pub chunks_total: usize,
    /// Chunks that could not be summarized; nonzero means the report has
    /// incomplete coverage.
    pub chunks_skipped: usize,
    pub generated_at: DateTime<Utc>,
    pub usage: UsageSummary,
}

/// Builds a `Report` from the final summary.
pub struct ReportAssembler {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
    usage: Arc<UsageRecord>,
}

impl ReportAssembler {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Prompts, usage: Arc<UsageRecord>) -> Self {
        Self {
            model,
            prompts,
            usage,
        }
    }

    /// Generate highlights and action items and assemble the report.
    ///
    /// Usage is snapshotted after the derivation calls, so their token
    /// counts are part of the reported totals.
    #[instrument(skip_all, fields(meeting = %meeting_name))]
    pub async fn assemble(
        &self,
        meeting_name: &str,
        summary: &MeetingSummary,
        audio_model: &str,
    ) -> Result<Report> {
        let highlights = self.derive(&self.prompts.highlights.system, {
            let mut vars = HashMap::new();
            vars.insert("summary".to_string(), summary.text.clone());
            self.prompts
                .render_with_custom(&self.prompts.highlights.user, &vars)
        })
        .await?;
        info!("Generated highlights");

        let action_items = self.derive(&self.prompts.actions.system, {
            let mut vars = HashMap::new();
            vars.insert("summary".to_string(), summary.text.clone());
            self.prompts
                .render_with_custom(&self.prompts.actions.user, &vars)
        })
        .await?;
        info!("Generated action items");

        Ok(Report {
            meeting_name: meeting_name.to_string(),
            summary: summary.text.clone(),
            highlights,
            action_items,
            chunks_total: summary.chunks_total,
            chunks_skipped: summary.chunks_skipped,
            generated_at: Utc::now(),
            usage: self.usage.summarize(audio_model, self.model.name()),
        })
    }

    async fn derive(&self, system_prompt: &str, user_prompt: String) -> Result<String> {
        let completion = self.model.complete(system_prompt, &user_prompt).await?;
        self.usage
            .add_completion(completion.prompt_tokens, completion.completion_tokens);
        Ok(trim_to_last_list_item(&completion.text).to_string())
    }
}

/// Cut a model response off after its last list item.
///
/// Models occasionally append a trailing remark after the requested list
/// ("Let me know if..."); everything after the last `-` line is dropped.
/// Responses without list lines pass through unchanged.
fn trim_to_last_list_item(text: &str) -> &str {
    let mut end = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with('-') {
            end = Some(offset + line.trim_end_matches('\n').len());
        }
        offset += line.len();
    }

    match end {
        Some(end) => &text[..end],
        None => text,
    }
}
