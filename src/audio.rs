//! Audio probing and segmentation via ffmpeg/ffprobe.
//!
//! Meeting recordings arrive in whatever format the recorder produced
//! (wav, m4a, mp4, mp3). Non-mp3 inputs are normalized before upload, and
//! recordings longer than the API's comfortable request size are split
//! into fixed-length segments.

use crate::error::{ReferatError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Input formats accepted for normalization.
const CONVERTIBLE_EXTENSIONS: &[&str] = &["wav", "m4a", "mp4", "ogg", "webm", "flac"];

/// Duration of an audio file in seconds, via ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReferatError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(ReferatError::ToolFailed(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(ReferatError::Transcription(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|_| ReferatError::Transcription("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ReferatError::Transcription("Could not determine audio duration".into()))
}

/// Ensure the recording is an mp3, converting into `work_dir` if needed.
///
/// Returns the original path untouched when it already is an mp3.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn ensure_mp3(source: &Path, work_dir: &Path) -> Result<PathBuf> {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if ext == "mp3" {
        return Ok(source.to_path_buf());
    }

    if !CONVERTIBLE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ReferatError::InvalidInput(format!(
            "unsupported audio format: .{}",
            ext
        )));
    }

    std::fs::create_dir_all(work_dir)?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording");
    let dest = work_dir.join(format!("{}.mp3", stem));

    info!("Converting {} to mp3", source.display());

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(dest),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ReferatError::ToolFailed(format!(
                "ffmpeg conversion failed: {err}"
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReferatError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(ReferatError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

/// Segment a long recording into chunks of roughly `segment_seconds`.
///
/// Returns (segment_path, offset_seconds) pairs in playback order. Short
/// recordings come back as a single entry pointing at the source itself.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    segment_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let segment_len = segment_seconds as f64;

    if total_duration <= segment_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let segment_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let length = segment_len.min(total_duration - offset);

        extract_segment(source, &segment_path, offset, length).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((segment_path, offset));

        offset += segment_len;
        idx += 1;
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

/// Extract a time segment from an audio file.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    // First attempt: stream copy (fast, no quality loss)
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    // Fallback: re-encode to MP3
    warn!("Stream copy failed, re-encoding segment");

    let encode_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match encode_result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ReferatError::ToolFailed(format!(
                "Segment extraction failed: {err}"
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReferatError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(ReferatError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("slides.pdf");
        std::fs::write(&source, b"not audio").unwrap();

        let err = ensure_mp3(&source, dir.path()).await.unwrap_err();
        assert!(matches!(err, ReferatError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_mp3_passes_through_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("standup.mp3");
        std::fs::write(&source, b"fake mp3").unwrap();

        let result = ensure_mp3(&source, dir.path()).await.unwrap();
        assert_eq!(result, source);
    }
}
