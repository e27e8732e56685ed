//! CLI module for Referat.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Referat - Meeting minutes from recordings
///
/// Transcribes a meeting recording, summarizes it with a language model,
/// and exports readable meeting minutes. The name "Referat" is the
/// Norwegian word for meeting minutes.
#[derive(Parser, Debug)]
#[command(name = "referat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a meeting recording and generate a report
    Report {
        /// Audio file of the meeting (mp3, wav, m4a, mp4)
        input: Option<String>,

        /// Meeting name used in the report and output file names
        #[arg(short, long)]
        name: Option<String>,

        /// Use an existing transcript file instead of transcribing audio
        #[arg(short, long)]
        transcript: Option<String>,

        /// Output directory for the report files
        #[arg(short, long)]
        output: Option<String>,

        /// Audio model (local-tiny, local-base, local-small, local-medium, remote-api)
        #[arg(long)]
        audio_model: Option<String>,

        /// Chat model for summarization
        #[arg(long)]
        text_model: Option<String>,

        /// Include usage and cost figures in the text report
        #[arg(long)]
        show_cost: bool,

        /// Ignore a transcript file saved by a previous run
        #[arg(long)]
        no_reuse: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Write a default configuration file
    Init,
    /// Print the configuration file path
    Path,
}
