//! Speech-to-text transcription.
//!
//! Two implementations sit behind the `Transcriber` trait: the OpenAI
//! Whisper API (`remote-api`) and whisper.cpp running locally
//! (`local-tiny` through `local-medium`). Which one is used is purely a
//! configuration choice; the rest of the pipeline only sees the trait.

mod whisper_api;
mod whisper_local;

pub use whisper_api::WhisperApiTranscriber;
pub use whisper_local::LocalWhisperTranscriber;

use crate::config::{Settings, TranscriptionSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// A finished transcript for one recording.
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Verbatim transcript text.
    pub text: String,
    /// Recording length in seconds.
    pub duration_seconds: f64,
}

impl Transcript {
    /// Recording length in whole minutes, rounded up like the billing
    /// meter.
    pub fn duration_minutes(&self) -> u64 {
        (self.duration_seconds / 60.0).ceil() as u64
    }
}

/// Trait for speech-to-text services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file to text.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;

    /// Model identifier, used for reporting.
    fn model_name(&self) -> &str;
}

/// Create a transcriber matching the configured audio model.
pub fn create_transcriber(settings: &Settings) -> Result<Arc<dyn Transcriber>> {
    let transcription: &TranscriptionSettings = &settings.transcription;
    let model = transcription.model;

    if model.is_remote() {
        Ok(Arc::new(WhisperApiTranscriber::with_config(
            transcription.segment_seconds,
            transcription.max_concurrent_segments,
            settings.temp_dir(),
        )))
    } else {
        Ok(Arc::new(LocalWhisperTranscriber::with_config(
            model,
            Settings::expand_path(&settings.transcription.model_dir),
            settings.temp_dir(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_minutes_round_up() {
        let t = Transcript {
            text: "hello".to_string(),
            duration_seconds: 61.0,
        };
        assert_eq!(t.duration_minutes(), 2);
    }

    #[test]
    fn test_factory_respects_selector() {
        let mut settings = Settings::default();
        settings.transcription.model = crate::config::AudioModel::RemoteApi;
        let t = create_transcriber(&settings).unwrap();
        assert_eq!(t.model_name(), "whisper-1");

        settings.transcription.model = crate::config::AudioModel::LocalBase;
        let t = create_transcriber(&settings).unwrap();
        assert_eq!(t.model_name(), "base");
    }
}
