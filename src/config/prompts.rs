//! Prompt templates for Referat.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory. Templates use `{{variable}}` placeholders.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Map pass: summarize one transcript chunk.
    pub summarize: SummarizePrompts,
    /// Reduce pass: combine partial summaries.
    pub combine: CombinePrompts,
    /// Highlight extraction from the final summary.
    pub highlights: HighlightPrompts,
    /// Action item extraction from the final summary.
    pub actions: ActionItemPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for summarizing a single transcript chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizePrompts {
    pub system: String,
    pub user: String,
}

impl Default for SummarizePrompts {
    fn default() -> Self {
        Self {
            system: "You are a meeting minutes analyst. You condense raw meeting \
transcripts into accurate, readable summaries. Preserve decisions, names, \
dates, and numbers exactly as stated. Do not invent content that is not in \
the transcript."
                .to_string(),

            user: r#"This is one part of a longer meeting transcript:

"{{chunk}}"

Write a concise summary of this part. Keep every decision, commitment, and
open question. Your summary:"#
                .to_string(),
        }
    }
}

/// Prompts for merging partial summaries during the reduce pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinePrompts {
    pub system: String,
    pub user: String,
}

impl Default for CombinePrompts {
    fn default() -> Self {
        Self {
            system: "You are a meeting minutes analyst. You merge partial summaries \
of consecutive parts of one meeting into a single coherent summary, keeping \
chronological order and removing repetition."
                .to_string(),

            user: r#"Below are partial summaries of consecutive parts of the same meeting:

{{summaries}}

Combine these partial summaries into one coherent summary of the whole
meeting so far. Keep decisions, commitments, and open questions. Your
combined summary:"#
                .to_string(),
        }
    }
}

/// Prompts for extracting highlights from the final summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightPrompts {
    pub system: String,
    pub user: String,
}

impl Default for HighlightPrompts {
    fn default() -> Self {
        Self {
            system: "You are a meeting minutes analyst. You list the key points \
discussed in a meeting based on its summary."
                .to_string(),

            user: r#"Meeting summary:

"{{summary}}"

List the key points that were discussed, using this format:

1. [topic title]:
- [key point explanation]

Polish the wording and fix obvious transcription typos. Your response:"#
                .to_string(),
        }
    }
}

/// Prompts for extracting action items from the final summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionItemPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ActionItemPrompts {
    fn default() -> Self {
        Self {
            system: "You are a meeting minutes analyst. You list the follow-up \
actions agreed in a meeting based on its summary."
                .to_string(),

            user: r#"Meeting summary:

"{{summary}}"

List the actions to take after this meeting, using this format:

- [action item]

Include an owner when one was named. Your response:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from defaults, with optional custom directory and
    /// variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summarize_path = custom_path.join("summarize.toml");
            if summarize_path.exists() {
                let content = std::fs::read_to_string(&summarize_path)?;
                prompts.summarize = toml::from_str(&content)?;
            }

            let combine_path = custom_path.join("combine.toml");
            if combine_path.exists() {
                let content = std::fs::read_to_string(&combine_path)?;
                prompts.combine = toml::from_str(&content)?;
            }

            let highlights_path = custom_path.join("highlights.toml");
            if highlights_path.exists() {
                let content = std::fs::read_to_string(&highlights_path)?;
                prompts.highlights = toml::from_str(&content)?;
            }

            let actions_path = custom_path.join("actions.toml");
            if actions_path.exists() {
                let content = std::fs::read_to_string(&actions_path)?;
                prompts.actions = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom
    /// config variables. Provided variables take precedence.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
