//! Configuration settings for Referat.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcription: TranscriptionSettings,
    pub summarization: SummarizationSettings,
    pub report: ReportSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where reports are written.
    pub output_dir: String,
    /// Directory for temporary files (audio segments).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            temp_dir: "/tmp/referat".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Speech-to-text model selector.
///
/// The `local-*` variants run whisper.cpp on this machine; `remote-api`
/// sends audio to the OpenAI Whisper API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AudioModel {
    LocalTiny,
    LocalBase,
    #[default]
    LocalSmall,
    LocalMedium,
    RemoteApi,
}

impl AudioModel {
    /// Whether this selector uses the remote Whisper API.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioModel::RemoteApi)
    }

    /// Model name as reported in usage records.
    pub fn model_name(&self) -> &'static str {
        match self {
            AudioModel::LocalTiny => "tiny",
            AudioModel::LocalBase => "base",
            AudioModel::LocalSmall => "small",
            AudioModel::LocalMedium => "medium",
            AudioModel::RemoteApi => "whisper-1",
        }
    }
}

impl std::str::FromStr for AudioModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local-tiny" | "tiny" => Ok(AudioModel::LocalTiny),
            "local-base" | "base" => Ok(AudioModel::LocalBase),
            "local-small" | "small" => Ok(AudioModel::LocalSmall),
            "local-medium" | "medium" => Ok(AudioModel::LocalMedium),
            "remote-api" | "api" | "whisper-1" => Ok(AudioModel::RemoteApi),
            _ => Err(format!("Unknown audio model: {}", s)),
        }
    }
}

impl std::fmt::Display for AudioModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioModel::LocalTiny => write!(f, "local-tiny"),
            AudioModel::LocalBase => write!(f, "local-base"),
            AudioModel::LocalSmall => write!(f, "local-small"),
            AudioModel::LocalMedium => write!(f, "local-medium"),
            AudioModel::RemoteApi => write!(f, "remote-api"),
        }
    }
}

/// Transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Speech-to-text model selector.
    pub model: AudioModel,
    /// Directory holding whisper.cpp model files (local mode).
    pub model_dir: String,
    /// Duration in seconds for splitting long audio files (API mode).
    pub segment_seconds: u32,
    /// Maximum concurrent segment transcription calls.
    pub max_concurrent_segments: usize,
    /// Longest audio accepted, in minutes.
    pub max_audio_minutes: u64,
    /// Reuse an existing transcript file next to the audio instead of
    /// transcribing again.
    pub reuse_transcript: bool,
    /// Save the transcript next to the audio file after transcription.
    pub save_transcript: bool,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: AudioModel::default(),
            model_dir: "~/.referat/models".to_string(),
            segment_seconds: 900,
            max_concurrent_segments: 3,
            max_audio_minutes: 240, // 4 hours
            reuse_transcript: true,
            save_transcript: true,
        }
    }
}

/// Summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationSettings {
    /// Chat model used for all summarization calls.
    pub model: String,
    /// Context window of that model, in tokens.
    pub context_window: usize,
    /// Tokens reserved for instructions and the completion.
    pub reserved_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap per call.
    pub max_completion_tokens: u32,
    /// Attempts per model call before giving up.
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff, in seconds.
    pub retry_base_delay_secs: u64,
    /// Maximum concurrent summarization calls.
    pub max_concurrent_calls: usize,
}

impl Default for SummarizationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-16k".to_string(),
            context_window: 16384,
            reserved_tokens: 2048,
            temperature: 0.1,
            max_completion_tokens: 1000,
            max_attempts: 3,
            retry_base_delay_secs: 2,
            max_concurrent_calls: 2,
        }
    }
}

impl SummarizationSettings {
    /// Input token budget per call: the context window minus the margin
    /// reserved for instructions and the completion.
    pub fn max_input_tokens(&self) -> usize {
        self.context_window
            .saturating_sub(self.reserved_tokens)
            .max(1)
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Include usage and cost figures in the text export.
    pub show_cost: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self { show_cost: false }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReferatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("referat")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_are_consistent() {
        let settings = Settings::default();
        assert!(settings.summarization.max_input_tokens() > 0);
        assert!(settings.summarization.max_input_tokens() < settings.summarization.context_window);
        assert_eq!(settings.transcription.max_audio_minutes, 240);
    }

    #[test]
    fn test_audio_model_round_trip() {
        for name in ["local-tiny", "local-base", "local-small", "local-medium", "remote-api"] {
            let model = AudioModel::from_str(name).unwrap();
            assert_eq!(model.to_string(), name);
        }
        assert!(AudioModel::from_str("huge").is_err());
    }

    #[test]
    fn test_remote_selector() {
        assert!(AudioModel::RemoteApi.is_remote());
        assert!(!AudioModel::LocalSmall.is_remote());
        assert_eq!(AudioModel::RemoteApi.model_name(), "whisper-1");
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let toml_str = r#"
            [summarization]
            model = "gpt-4o-mini"
            context_window = 128000
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.summarization.model, "gpt-4o-mini");
        assert_eq!(settings.summarization.max_attempts, 3);
        assert_eq!(settings.transcription.segment_seconds, 900);
    }
}
