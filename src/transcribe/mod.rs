use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

use crate::Vid2DocError;

/// Full transcription of a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// The complete concatenated transcript text
    pub text: String,

    /// Time-stamped segments in spoken order
    pub segments: Vec<TranscriptSegment>,
}

/// Individual transcript segment with timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Segment text
    pub text: String,
}

/// Trait for producing a transcript from a video file
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the full video before any document construction begins
    async fn transcribe(&self, video: &Path) -> Result<Transcript>;
}

/// Whisper JSON output format (only the fields we consume)
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Transcriber that shells out to the whisper CLI
pub struct WhisperCliTranscriber {
    whisper_path: String,
    model: String,
    quiet: bool,
}

impl WhisperCliTranscriber {
    pub fn new(model: impl Into<String>, quiet: bool) -> Self {
        Self {
            whisper_path: "whisper".to_string(),
            model: model.into(),
            quiet,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, video: &Path) -> Result<Transcript> {
        tracing::info!("Transcribing {} with whisper model '{}'", video.display(), self.model);

        // Whisper writes its JSON next to other output files, so give it a
        // private directory and pick the file up afterwards.
        let out_dir = TempDir::new().context("Failed to create whisper output directory")?;

        let progress = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        progress.set_message("Transcribing audio...");
        progress.enable_steady_tick(std::time::Duration::from_millis(120));

        let output = Command::new(&self.whisper_path)
            .arg(video)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg("json")
            .arg("--output_dir")
            .arg(out_dir.path())
            .arg("--verbose")
            .arg("False")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to spawn whisper")?;

        progress.finish_with_message("Transcription complete");

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(Vid2DocError::TranscriptionFailed(error.trim().to_string()).into());
        }

        // Whisper names the JSON after the input file's stem
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let json_path = out_dir.path().join(format!("{stem}.json"));

        let json_str = fs_err::read_to_string(&json_path)
            .context("Whisper did not produce a JSON transcript")?;

        let parsed: WhisperOutput = serde_json::from_str(&json_str)
            .context("Failed to parse whisper JSON output")?;

        tracing::debug!("Transcribed {} segments", parsed.segments.len());

        Ok(Transcript {
            text: parsed.text.trim().to_string(),
            segments: parsed
                .segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text.trim().to_string(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_whisper_json() {
        let json = r#"{
            "text": " Open settings. Click save.",
            "segments": [
                {"id": 0, "seek": 0, "start": 0.0, "end": 2.5, "text": " Open settings.", "tokens": []},
                {"id": 1, "seek": 0, "start": 2.5, "end": 4.0, "text": " Click save.", "tokens": []}
            ],
            "language": "en"
        }"#;

        let parsed: WhisperOutput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[0].start, 0.0);
        assert_eq!(parsed.segments[1].text.trim(), "Click save.");
    }
}
