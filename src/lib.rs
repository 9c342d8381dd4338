//! vid2doc - A Rust CLI tool that turns a screen recording into an illustrated document
//!
//! This library transcribes the spoken audio of a video into time-stamped segments,
//! extracts a still frame per segment, and assembles segments and frames into a
//! step-by-step document in docx, pdf, markdown, or html form.

pub mod cli;
pub mod config;
pub mod document;
pub mod frames;
pub mod input;
pub mod pipeline;
pub mod summarize;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use document::{DocFormat, DocumentBuilder};
pub use pipeline::{Pipeline, RunReport};
pub use transcribe::{Transcript, TranscriptSegment, Transcriber};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to vid2doc
#[derive(thiserror::Error, Debug)]
pub enum Vid2DocError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Template file not found: {0}")]
    TemplateMissing(std::path::PathBuf),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Summarization failed: {0}")]
    SummarizationFailed(String),

    #[error("Frame extraction failed: {0}")]
    FrameExtractionFailed(String),

    #[error("Document conversion failed: {0}")]
    ConversionFailed(String),
}
