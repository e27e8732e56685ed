//! Report command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{transcript_sidecar, Orchestrator, RunInput};
use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;

/// Run the report command.
#[allow(clippy::too_many_arguments)]
pub async fn run_report(
    input: Option<String>,
    name: Option<String>,
    transcript: Option<String>,
    output: Option<String>,
    audio_model: Option<String>,
    text_model: Option<String>,
    show_cost: bool,
    no_reuse: bool,
    mut settings: Settings,
) -> Result<()> {
    // Apply command-line overrides
    if let Some(model) = &audio_model {
        settings.transcription.model = crate::config::AudioModel::from_str(model)
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(model) = text_model {
        settings.summarization.model = model;
    }
    if let Some(dir) = output {
        settings.general.output_dir = dir;
    }
    if show_cost {
        settings.report.show_cost = true;
    }
    if no_reuse {
        settings.transcription.reuse_transcript = false;
    }

    let audio_path = input.as_deref().map(PathBuf::from);
    let transcript_path = transcript.as_deref().map(PathBuf::from);

    let Some(source) = audio_path.as_ref().or(transcript_path.as_ref()) else {
        Output::error("Provide an audio file, or a transcript with --transcript.");
        return Err(anyhow::anyhow!("no input provided"));
    };

    let meeting_name = name.unwrap_or_else(|| {
        source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("meeting")
            .to_string()
    });

    // Pre-flight checks: summarization always talks to the API; the
    // transcriber only runs when no transcript (given or saved) exists.
    let mut checks = vec![Operation::Summarize];
    if transcript_path.is_none() {
        let sidecar_available = audio_path
            .as_ref()
            .map(|p| settings.transcription.reuse_transcript && transcript_sidecar(p).exists())
            .unwrap_or(false);
        if !sidecar_available {
            checks.push(Operation::Transcribe(settings.transcription.model));
        }
    }
    for check in checks {
        if let Err(e) = preflight::check(check) {
            Output::error(&format!("{}", e));
            Output::info("Run 'referat doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    Output::info(&format!("Processing meeting: {}", meeting_name));

    let orchestrator = Orchestrator::new(settings)?;
    let run_input = RunInput {
        meeting_name,
        audio_path,
        transcript_path,
    };

    let outcome = orchestrator.run(&run_input).await?;
    let report = &outcome.report;

    if report.chunks_skipped > 0 {
        Output::warning(&format!(
            "{} of {} transcript sections could not be summarized; coverage is incomplete.",
            report.chunks_skipped, report.chunks_total
        ));
    }

    Output::header(&report.meeting_name);
    println!("{}\n", report.summary);
    Output::header("Highlights");
    println!("{}\n", report.highlights);
    Output::header("Action items");
    println!("{}\n", report.action_items);

    if show_cost {
        let usage = &report.usage;
        Output::header("Usage");
        Output::kv(
            "Audio",
            &format!(
                "{} ({} min, ${:.4})",
                usage.audio_model, usage.audio_minutes, usage.audio_cost
            ),
        );
        Output::kv(
            "Text",
            &format!(
                "{} ({} tokens, ${:.4})",
                usage.text_model, usage.total_tokens, usage.text_cost
            ),
        );
        Output::kv("Total", &format!("${:.4}", usage.total_cost));
    }

    Output::success(&format!(
        "Report written to {} and {}",
        outcome.txt_path.display(),
        outcome.json_path.display()
    ));

    Ok(())
}
