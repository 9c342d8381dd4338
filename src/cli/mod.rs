use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vid2doc",
    about = "vid2doc - Turn a screen recording into an illustrated step-by-step document",
    version,
    long_about = "A CLI tool that transcribes the audio of a video, captures a still frame per spoken segment, asks a language model for a title and summary, and assembles everything into a docx, pdf, markdown, or html document."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a video into an illustrated document
    Convert {
        /// Input video: a local file path or an http(s) URL
        #[arg(value_name = "VIDEO")]
        input: String,

        /// Output document path; the extension selects the format (doc, docx, pdf, md, html)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Embedded image width in inches (overrides the configured default)
        #[arg(long, value_name = "INCHES")]
        image_width: Option<f64>,

        /// Whisper model to transcribe with (overrides the configured default)
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// Keep a downloaded remote video after the run instead of deleting it
        #[arg(long)]
        keep_video: bool,
    },

    /// List supported output formats
    Formats,

    /// Configure the language-model endpoint and defaults
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
