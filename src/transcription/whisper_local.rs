//! Local transcription via whisper.cpp.
//!
//! Runs the `whisper-cli` binary against a ggml model file. Keeps audio on
//! the machine, costs nothing per minute, and needs no API key; the trade
//! is speed and having to download a model first.

use super::{Transcriber, Transcript};
use crate::audio::probe_duration;
use crate::config::AudioModel;
use crate::error::{ReferatError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// whisper.cpp-backed transcriber.
pub struct LocalWhisperTranscriber {
    model: AudioModel,
    model_dir: PathBuf,
    temp_dir: PathBuf,
}

impl LocalWhisperTranscriber {
    pub fn with_config(model: AudioModel, model_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            model,
            model_dir,
            temp_dir,
        }
    }

    /// Path to the ggml model file for the selected size.
    fn model_path(&self) -> Result<PathBuf> {
        let path = self
            .model_dir
            .join(format!("ggml-{}.bin", self.model.model_name()));

        if !path.exists() {
            return Err(ReferatError::Config(format!(
                "Whisper model not found: {}. Download it with whisper.cpp's \
download-ggml-model.sh and place it in {}",
                path.display(),
                self.model_dir.display()
            )));
        }

        Ok(path)
    }

    /// Resample to the 16 kHz mono wav whisper.cpp expects.
    async fn prepare_wav(&self, source: &Path, work_dir: &Path) -> Result<PathBuf> {
        let wav_path = work_dir.join("input.wav");

        let result = Command::new("ffmpeg")
            .arg("-i").arg(source)
            .arg("-ar").arg("16000")
            .arg("-ac").arg("1")
            .arg("-c:a").arg("pcm_s16le")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(&wav_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => Ok(wav_path),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(ReferatError::ToolFailed(format!(
                    "ffmpeg resampling failed: {err}"
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReferatError::ToolNotFound("ffmpeg".into()))
            }
            Err(e) => Err(ReferatError::ToolFailed(format!("ffmpeg error: {e}"))),
        }
    }
}

#[async_trait]
impl Transcriber for LocalWhisperTranscriber {
    #[instrument(skip(self), fields(audio = %audio_path.display(), model = %self.model))]
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let model_path = self.model_path()?;
        let duration_seconds = probe_duration(audio_path).await?;

        std::fs::create_dir_all(&self.temp_dir)?;
        let work_dir = tempfile::tempdir_in(&self.temp_dir)?;

        let wav_path = self.prepare_wav(audio_path, work_dir.path()).await?;
        let output_prefix = work_dir.path().join("transcript");

        info!("Running whisper.cpp ({} model)", self.model.model_name());

        let result = Command::new("whisper-cli")
            .arg("-m").arg(&model_path)
            .arg("-f").arg(&wav_path)
            .arg("--no-prints")
            .arg("--no-timestamps")
            .arg("--output-txt")
            .arg("--output-file").arg(&output_prefix)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReferatError::ToolNotFound("whisper-cli".into()));
            }
            Err(e) => {
                return Err(ReferatError::ToolFailed(format!(
                    "whisper-cli execution failed: {e}"
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReferatError::Transcription(format!(
                "whisper-cli failed: {stderr}"
            )));
        }

        let transcript_path = output_prefix.with_extension("txt");
        let text = std::fs::read_to_string(&transcript_path)
            .map_err(|e| {
                ReferatError::Transcription(format!(
                    "whisper-cli produced no transcript: {e}"
                ))
            })?
            .trim()
            .to_string();

        debug!("Transcribed {} characters", text.len());

        Ok(Transcript {
            text,
            duration_seconds,
        })
    }

    fn model_name(&self) -> &str {
        self.model.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_model_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let t = LocalWhisperTranscriber::with_config(
            AudioModel::LocalTiny,
            dir.path().join("no-models-here"),
            dir.path().to_path_buf(),
        );

        let err = t.model_path().unwrap_err();
        assert!(matches!(err, ReferatError::Config(_)));
    }
}
