use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::Config;
use crate::document::{self, DocumentBuilder};
use crate::frames::{FfmpegFrameExtractor, FrameExtractor};
use crate::input::{self, ResolvedInput};
use crate::summarize::{OpenAiSummarizer, Summarizer};
use crate::transcribe::{Transcriber, TranscriptSegment, WhisperCliTranscriber};
use crate::utils;

/// Outcome of one end-to-end run
#[derive(Debug)]
pub struct RunReport {
    /// Path of the produced document
    pub output_path: PathBuf,

    /// Number of steps written, numbered 1..=steps_written
    pub steps_written: usize,

    /// Segments that were skipped, in original order
    pub failures: Vec<SegmentFailure>,
}

/// One skipped segment. Skipped segments consume no step number; the
/// remaining steps stay contiguous.
#[derive(Debug)]
pub struct SegmentFailure {
    /// 1-based position of the segment in the transcript
    pub segment_index: usize,

    /// Segment start time in seconds
    pub start: f64,

    /// Human-readable reason
    pub error: String,
}

/// End-to-end pipeline: transcribe, summarize, then feed segments and frames
/// through a format-specific document builder. Strictly sequential; the one
/// piece of shared mutable state is the per-run scratch directory, which this
/// pipeline owns from creation through postprocess.
pub struct Pipeline {
    config: Config,
    transcriber: Box<dyn Transcriber>,
    summarizer: Box<dyn Summarizer>,
    frame_extractor: Box<dyn FrameExtractor>,
    temp_dir: TempDir,
}

impl Pipeline {
    /// Create a pipeline with the real collaborators (whisper, the configured
    /// chat-completions endpoint, ffmpeg)
    pub fn new(config: Config) -> Result<Self> {
        let summarizer = OpenAiSummarizer::new(&config.llm)?;
        let transcriber =
            WhisperCliTranscriber::new(config.app.whisper_model.clone(), config.app.quiet);

        Self::with_collaborators(
            config,
            Box::new(transcriber),
            Box::new(summarizer),
            Box::new(FfmpegFrameExtractor::new()),
        )
    }

    /// Create a pipeline with injected collaborators
    pub fn with_collaborators(
        config: Config,
        transcriber: Box<dyn Transcriber>,
        summarizer: Box<dyn Summarizer>,
        frame_extractor: Box<dyn FrameExtractor>,
    ) -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;

        Ok(Self {
            config,
            transcriber,
            summarizer,
            frame_extractor,
            temp_dir,
        })
    }

    /// Drive one run: resolve the format, prepare scratch state, transcribe,
    /// summarize, assemble, save, postprocess.
    pub async fn run(&self, input: &str, output_path: &Path) -> Result<RunReport> {
        // Unsupported extensions fail before any expensive work
        let format = document::DocFormat::from_output_path(output_path)?;
        tracing::info!("Resolved output format: {}", format);

        let frames_dir = document::prepare_frames_dir(output_path)?;

        let resolved = input::resolve(input, self.temp_dir.path(), self.config.app.quiet).await?;
        let video = resolved.path();

        // The title and summary need the complete text, so transcription
        // finishes before any document construction starts.
        let transcript = self.transcriber.transcribe(video).await?;
        if let Some(last) = transcript.segments.last() {
            tracing::info!(
                "Transcribed {} segments covering {}",
                transcript.segments.len(),
                utils::format_duration(last.end)
            );
        }

        let (title, summary) = self.summarizer.title_and_summary(&transcript.text).await?;

        let mut builder = document::builder_for(format, output_path, &self.config)?;

        let (steps_written, failures) = assemble_document(
            builder.as_mut(),
            &title,
            &summary,
            &transcript.segments,
            video,
            &frames_dir,
            self.frame_extractor.as_ref(),
            self.config.app.image_width_inches,
        )
        .await;

        builder.save(output_path).await?;
        // Postprocess only runs after a successful save; a failed save keeps
        // the scratch state around for diagnosis.
        builder.postprocess(output_path).await?;

        self.preserve_downloaded_video(&resolved, output_path)?;

        Ok(RunReport {
            output_path: output_path.to_path_buf(),
            steps_written,
            failures,
        })
    }

    /// Copy a downloaded video next to the output when configured to keep it;
    /// otherwise it disappears with the pipeline's temp directory.
    fn preserve_downloaded_video(&self, resolved: &ResolvedInput, output_path: &Path) -> Result<()> {
        if let ResolvedInput::Downloaded(path) = resolved {
            if self.config.app.keep_video {
                let name = path
                    .file_name()
                    .map(|name| name.to_os_string())
                    .unwrap_or_else(|| "input.mp4".into());
                let target = output_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(name);
                fs_err::copy(path, &target)?;
                tracing::info!("Kept downloaded video at {}", target.display());
            }
        }
        Ok(())
    }
}

/// Feed title, summary, and segments through a builder in the fixed order,
/// extracting one frame per segment.
///
/// The per-segment loop is a best-effort fold: a frame-extraction or append
/// failure is logged and recorded, consumes no step number, and does not stop
/// later segments, so step numbering stays contiguous in the final document.
#[allow(clippy::too_many_arguments)]
pub async fn assemble_document(
    builder: &mut dyn DocumentBuilder,
    title: &str,
    summary: &str,
    segments: &[TranscriptSegment],
    video: &Path,
    frames_dir: &Path,
    frame_extractor: &dyn FrameExtractor,
    image_width_inches: f64,
) -> (usize, Vec<SegmentFailure>) {
    builder.add_title(title);
    builder.add_summary(summary);
    builder.add_steps_heading();

    let mut counter = 1usize;
    let mut failures = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        tracing::debug!(
            "[{:.2} - {:.2}] {}",
            segment.start,
            segment.end,
            segment.text
        );

        let appended = append_step(
            builder,
            segment,
            video,
            frames_dir,
            frame_extractor,
            counter,
            image_width_inches,
        )
        .await;

        match appended {
            Ok(()) => counter += 1,
            Err(e) => {
                tracing::warn!(
                    "Skipping segment {} (start {:.2}s): {:#}",
                    index + 1,
                    segment.start,
                    e
                );
                failures.push(SegmentFailure {
                    segment_index: index + 1,
                    start: segment.start,
                    error: format!("{e:#}"),
                });
            }
        }
    }

    (counter - 1, failures)
}

/// Extract the segment's frame and append one step
async fn append_step(
    builder: &mut dyn DocumentBuilder,
    segment: &TranscriptSegment,
    video: &Path,
    frames_dir: &Path,
    frame_extractor: &dyn FrameExtractor,
    step_number: usize,
    image_width_inches: f64,
) -> Result<()> {
    let frame_path = frame_extractor
        .extract(video, frames_dir, segment.start, step_number)
        .await?;

    builder.add_step(&segment.text, &frame_path, step_number, image_width_inches)
}
