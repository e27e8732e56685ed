//! Configuration module for Referat.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    ActionItemPrompts, CombinePrompts, HighlightPrompts, Prompts, SummarizePrompts,
};
pub use settings::{
    AudioModel, GeneralSettings, PromptSettings, ReportSettings, Settings,
    SummarizationSettings, TranscriptionSettings,
};
