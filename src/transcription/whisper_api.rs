//! OpenAI Whisper API transcription.

use super::{Transcriber, Transcript};
use crate::audio::{ensure_mp3, probe_duration, split_audio};
use crate::error::{ReferatError, Result};
use crate::openai::audio_client;
use async_openai::types::CreateTranscriptionRequestArgs;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Whisper API transcriber.
///
/// The API caps request sizes, so long recordings are split into segments
/// which are transcribed concurrently and rejoined in playback order.
pub struct WhisperApiTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    segment_seconds: u32,
    max_concurrent: usize,
    temp_dir: PathBuf,
}

impl WhisperApiTranscriber {
    pub fn new() -> Self {
        Self::with_config(900, 3, std::env::temp_dir().join("referat"))
    }

    pub fn with_config(segment_seconds: u32, max_concurrent: usize, temp_dir: PathBuf) -> Self {
        Self {
            client: audio_client(),
            segment_seconds,
            max_concurrent: max_concurrent.max(1),
            temp_dir,
        }
    }

    /// Transcribe one audio segment.
    #[instrument(skip(self), fields(segment = %segment_path.display()))]
    async fn transcribe_segment(&self, segment_path: &Path) -> Result<String> {
        debug!("Transcribing segment");

        let file_bytes = tokio::fs::read(segment_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(async_openai::types::AudioInput::from_vec_u8(
                segment_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model("whisper-1")
            .build()
            .map_err(|e| ReferatError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| ReferatError::OpenAI(format!("Whisper API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }
}

impl Default for WhisperApiTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let duration_seconds = probe_duration(audio_path).await?;

        std::fs::create_dir_all(&self.temp_dir)?;
        let work_dir = tempfile::tempdir_in(&self.temp_dir)?;

        let mp3_path = ensure_mp3(audio_path, work_dir.path()).await?;
        let segments = split_audio(&mp3_path, work_dir.path(), self.segment_seconds).await?;

        if segments.len() == 1 {
            let text = self.transcribe_segment(&segments[0].0).await?;
            return Ok(Transcript {
                text,
                duration_seconds,
            });
        }

        let segment_count = segments.len();
        info!("Transcribing {} audio segments via Whisper API", segment_count);

        let pb = Arc::new(ProgressBar::new(segment_count as u64));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Whisper   [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("█▓░"),
        );

        // Transcribe segments in parallel, fail fast on error, then
        // reassemble in playback order.
        let mut results: Vec<(usize, String)> = Vec::with_capacity(segment_count);

        let mut stream = stream::iter(segments.into_iter().enumerate())
            .map(|(idx, (segment_path, offset))| async move {
                let result = self.transcribe_segment(&segment_path).await;
                (idx, offset, result)
            })
            .buffer_unordered(self.max_concurrent);

        while let Some((idx, offset, result)) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(text) => results.push((idx, text)),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(ReferatError::Transcription(format!(
                        "Segment {} at {:.0}s failed: {}",
                        idx, offset, e
                    )));
                }
            }
        }
        drop(stream);

        pb.finish_and_clear();

        results.sort_by_key(|(idx, _)| *idx);
        let text = results
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Transcript {
            text,
            duration_seconds,
        })
    }

    fn model_name(&self) -> &str {
        "whisper-1"
    }
}
