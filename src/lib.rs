//! Referat - Meeting minutes from recordings
//!
//! A CLI tool that turns a meeting recording into readable meeting minutes.
//!
//! The name "Referat" is the Norwegian word for meeting minutes.
//!
//! # Overview
//!
//! Referat allows you to:
//! - Transcribe a meeting recording, locally with whisper.cpp or via the API
//! - Summarize long transcripts with a token-budgeted map/reduce pipeline
//! - Derive highlights and action items from the summary
//! - Export the report as text and JSON, with optional cost accounting
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt management
//! - `audio` - Audio probing, conversion and segmentation
//! - `transcription` - Speech-to-text transcription
//! - `tokens` - Token estimation
//! - `chunking` - Transcript chunking under a token budget
//! - `llm` - Language model abstraction
//! - `summarize` - Map/reduce summarization
//! - `report` - Report assembly and export
//! - `usage` - API usage and cost accounting
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use referat::config::Settings;
//! use referat::orchestrator::{Orchestrator, RunInput};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let outcome = orchestrator
//!         .run(&RunInput {
//!             meeting_name: "weekly-sync".to_string(),
//!             audio_path: Some("meeting.mp3".into()),
//!             transcript_path: None,
//!         })
//!         .await?;
//!     println!("Report written to {}", outcome.txt_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod report;
pub mod summarize;
pub mod tokens;
pub mod transcription;
pub mod usage;

pub use error::{ReferatError, Result};
