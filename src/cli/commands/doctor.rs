//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use console::style;

/// Check result for a single item.
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    hint: Option<String>,
}

#[derive(PartialEq)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);
        if let Some(hint) = &self.hint {
            println!("    {}", style(hint).dim());
        }
    }
}

/// Run the doctor command.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("System checks");

    let mut results = Vec::new();

    results.push(match preflight::check_api_key() {
        Ok(()) => CheckResult::ok("OPENAI_API_KEY", "configured"),
        Err(e) => CheckResult::error(
            "OPENAI_API_KEY",
            "missing",
            &format!("{}", e),
        ),
    });

    for tool in ["ffmpeg", "ffprobe"] {
        results.push(match preflight::check_tool(tool) {
            Ok(()) => CheckResult::ok(tool, "found"),
            Err(_) => CheckResult::error(
                tool,
                "not found",
                "Required for reading and splitting audio files.",
            ),
        });
    }

    results.push(match preflight::check_tool("whisper-cli") {
        Ok(()) => CheckResult::ok("whisper-cli", "found"),
        Err(_) => CheckResult::warning(
            "whisper-cli",
            "not found",
            "Only needed for local-* audio models. Install whisper.cpp to use them.",
        ),
    });

    let model_dir = Settings::expand_path(&settings.transcription.model_dir);
    let model_file = model_dir.join(format!(
        "ggml-{}.bin",
        settings.transcription.model.model_name()
    ));
    if settings.transcription.model.is_remote() {
        results.push(CheckResult::ok(
            "audio model",
            "remote-api (no local model needed)",
        ));
    } else if model_file.exists() {
        results.push(CheckResult::ok(
            "audio model",
            &format!("{}", model_file.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "audio model",
            "model file missing",
            &format!("Expected {}", model_file.display()),
        ));
    }

    for result in &results {
        result.print();
    }

    Output::header("Configuration");
    Output::kv("config file", &Settings::default_config_path().display().to_string());
    Output::kv("audio model", &settings.transcription.model.to_string());
    Output::kv("text model", &settings.summarization.model);
    Output::kv("output dir", &settings.output_dir().display().to_string());

    if results.iter().any(|r| r.status == CheckStatus::Error) {
        Output::warning("Some checks failed. Fix them before running 'referat report'.");
    } else {
        Output::success("All required checks passed.");
    }

    Ok(())
}
