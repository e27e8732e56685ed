//! Report export to text and JSON files.

use super::Report;
use crate::error::{ReferatError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes finished reports to the output directory.
pub struct ReportExporter {
    output_dir: PathBuf,
}

impl ReportExporter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// File-system friendly base name for the report files.
    fn file_stem(report: &Report) -> String {
        let name = report.meeting_name.trim();
        if name.is_empty() {
            return "meeting-minutes".to_string();
        }
        name.chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect()
    }

    /// Export the report as a readable text file.
    ///
    /// Returns the path written. Usage figures are appended only when
    /// `show_cost` is set.
    pub fn export_txt(&self, report: &Report, show_cost: bool) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{}.txt", Self::file_stem(report)));

        let mut content = String::new();
        content.push_str(&format!("# {}\n\n", report.meeting_name));
        content.push_str("## Summary\n");
        content.push_str(&report.summary);
        content.push_str("\n\n## Highlights\n");
        content.push_str(&report.highlights);
        content.push_str("\n\n## Action items\n");
        content.push_str(&report.action_items);
        content.push('\n');

        if report.chunks_skipped > 0 {
            content.push_str(&format!(
                "\nNote: {} of {} transcript sections could not be summarized; \
coverage is incomplete.\n",
                report.chunks_skipped, report.chunks_total
            ));
        }

        if show_cost {
            let usage = &report.usage;
            content.push_str("\n## Usage\n");
            content.push_str(&format!(
                "Audio: {} ({} min, ${:.4})\n",
                usage.audio_model, usage.audio_minutes, usage.audio_cost
            ));
            content.push_str(&format!(
                "Text: {} ({} prompt + {} completion tokens, ${:.4})\n",
                usage.text_model, usage.prompt_tokens, usage.completion_tokens, usage.text_cost
            ));
            content.push_str(&format!("Total: ${:.4}\n", usage.total_cost));
        }

        std::fs::write(&path, content)
            .map_err(|e| ReferatError::Export(format!("failed to write {}: {}", path.display(), e)))?;

        info!("Exported text report: {}", path.display());
        Ok(path)
    }

    /// Export the full report, usage included, as JSON.
    pub fn export_json(&self, report: &Report) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{}.json", Self::file_stem(report)));

        let content = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, content)
            .map_err(|e| ReferatError::Export(format!("failed to write {}: {}", path.display(), e)))?;

        info!("Exported JSON report: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::UsageRecord;
    use chrono::Utc;

    fn sample_report(skipped: usize) -> Report {
        let usage = UsageRecord::new();
        usage.add_completion(100, 50);
        usage.add_audio_seconds(120);

        Report {
            meeting_name: "Sprint planning".to_string(),
            summary: "We planned the sprint.".to_string(),
            highlights: "1. Sprint:\n- Planned".to_string(),
            action_items: "- Bob writes tests".to_string(),
            chunks_total: 5,
            chunks_skipped: skipped,
            generated_at: Utc::now(),
            usage: usage.summarize("whisper-1", "gpt-3.5-turbo-16k"),
        }
    }

    #[test]
    fn test_export_txt_sections() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(dir.path());

        let path = exporter.export_txt(&sample_report(0), false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert!(content.contains("# Sprint planning"));
        assert!(content.contains("## Summary"));
        assert!(content.contains("## Highlights"));
        assert!(content.contains("## Action items"));
        assert!(!content.contains("## Usage"));
        assert!(!content.contains("could not be summarized"));
    }

    #[test]
    fn test_export_txt_notes_skipped_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(dir.path());

        let path = exporter.export_txt(&sample_report(2), false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert!(content.contains("2 of 5 transcript sections could not be summarized"));
    }

    #[test]
    fn test_export_txt_with_cost() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(dir.path());

        let path = exporter.export_txt(&sample_report(0), true).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert!(content.contains("## Usage"));
        assert!(content.contains("whisper-1"));
        assert!(content.contains("100 prompt + 50 completion tokens"));
    }

    #[test]
    fn test_export_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ReportExporter::new(dir.path());

        let path = exporter.export_json(&sample_report(1)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Report = serde_json::from_str(&content).unwrap();

        assert_eq!(parsed.meeting_name, "Sprint planning");
        assert_eq!(parsed.chunks_skipped, 1);
        assert_eq!(parsed.usage.total_tokens, 150);
    }

    #[test]
    fn test_empty_meeting_name_gets_default_stem() {
        let mut report = sample_report(0);
        report.meeting_name = "  ".to_string();
        assert_eq!(ReportExporter::file_stem(&report), "meeting-minutes");
    }
}
