//! End-to-end pipeline tests using fake collaborators in place of whisper,
//! ffmpeg, and the chat-completions endpoint.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use vid2doc::config::Config;
use vid2doc::document::{self, DocumentBuilder};
use vid2doc::frames::{frame_filename, FrameExtractor};
use vid2doc::pipeline::{assemble_document, Pipeline};
use vid2doc::summarize::Summarizer;
use vid2doc::transcribe::{Transcriber, Transcript, TranscriptSegment};

// Smallest valid PNG: 1x1 transparent pixel (docx embedding decodes it)
const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
    TranscriptSegment {
        start,
        end,
        text: text.to_string(),
    }
}

/// Frame extractor that writes a tiny PNG per request and can be told to fail
/// at specific timestamps
struct FakeFrameExtractor {
    fail_at: Vec<f64>,
    requested_timestamps: Arc<Mutex<Vec<f64>>>,
}

impl FakeFrameExtractor {
    fn new() -> Self {
        Self {
            fail_at: Vec::new(),
            requested_timestamps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_at(fail_at: Vec<f64>) -> Self {
        Self {
            fail_at,
            ..Self::new()
        }
    }
}

#[async_trait]
impl FrameExtractor for FakeFrameExtractor {
    async fn extract(
        &self,
        _video: &Path,
        target_dir: &Path,
        timestamp: f64,
        step_number: usize,
    ) -> Result<PathBuf> {
        self.requested_timestamps.lock().unwrap().push(timestamp);

        if self.fail_at.iter().any(|t| (t - timestamp).abs() < 1e-9) {
            anyhow::bail!("Could not extract frame at {timestamp} seconds");
        }

        let path = target_dir.join(frame_filename(step_number));
        fs_err::write(&path, TINY_PNG)?;
        Ok(path)
    }
}

struct FakeTranscriber {
    transcript: Transcript,
    called: Arc<AtomicBool>,
}

impl FakeTranscriber {
    fn new(segments: Vec<TranscriptSegment>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            transcript: Transcript { text, segments },
            called: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _video: &Path) -> Result<Transcript> {
        self.called.store(true, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

struct FakeSummarizer;

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn title_and_summary(&self, _full_text: &str) -> Result<(String, String)> {
        Ok(("Enrolling a User".to_string(), "How to enroll.".to_string()))
    }
}

/// Builder that records every call so tests can assert ordering
#[derive(Default)]
struct RecordingBuilder {
    calls: Vec<String>,
    steps: Vec<(usize, String)>,
}

#[async_trait]
impl DocumentBuilder for RecordingBuilder {
    fn add_title(&mut self, title: &str) {
        self.calls.push(format!("title:{title}"));
    }

    fn add_summary(&mut self, summary: &str) {
        self.calls.push(format!("summary:{summary}"));
    }

    fn add_steps_heading(&mut self) {
        self.calls.push("steps_heading".to_string());
    }

    fn add_step(
        &mut self,
        text: &str,
        frame_path: &Path,
        step_number: usize,
        _image_width_inches: f64,
    ) -> Result<()> {
        assert!(frame_path.exists(), "frame must exist when the step is appended");
        self.calls.push(format!("step:{step_number}"));
        self.steps.push((step_number, text.to_string()));
        Ok(())
    }

    async fn save(&mut self, _output_path: &Path) -> Result<()> {
        self.calls.push("save".to_string());
        Ok(())
    }

    async fn postprocess(&mut self, _output_path: &Path) -> Result<()> {
        self.calls.push("postprocess".to_string());
        Ok(())
    }
}

fn test_config(templates_dir: &Path) -> Config {
    let mut config = Config::default();
    config.app.templates_dir = templates_dir.to_path_buf();
    config
}

fn make_pipeline(
    config: Config,
    segments: Vec<TranscriptSegment>,
    fail_at: Vec<f64>,
) -> Pipeline {
    Pipeline::with_collaborators(
        config,
        Box::new(FakeTranscriber::new(segments)),
        Box::new(FakeSummarizer),
        Box::new(FakeFrameExtractor::failing_at(fail_at)),
    )
    .unwrap()
}

#[tokio::test]
async fn all_segments_produce_contiguous_steps() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.md");
    let frames_dir = document::prepare_frames_dir(&output).unwrap();
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![
        segment(0.0, 2.0, "Open settings"),
        segment(2.0, 4.0, "Click save"),
        segment(4.0, 6.0, "Close the dialog"),
    ];

    let extractor = FakeFrameExtractor::new();
    let mut builder = RecordingBuilder::default();
    let (steps, failures) = assemble_document(
        &mut builder,
        "Title",
        "Summary",
        &segments,
        &video,
        &frames_dir,
        &extractor,
        5.0,
    )
    .await;

    assert_eq!(steps, 3);
    assert!(failures.is_empty());
    assert_eq!(
        builder.calls,
        vec!["title:Title", "summary:Summary", "steps_heading", "step:1", "step:2", "step:3"]
    );
    assert_eq!(builder.steps[0], (1, "Open settings".to_string()));
    assert_eq!(builder.steps[2], (3, "Close the dialog".to_string()));
}

#[tokio::test]
async fn failed_segment_is_skipped_and_numbering_stays_contiguous() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.md");
    let frames_dir = document::prepare_frames_dir(&output).unwrap();
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![
        segment(0.0, 2.0, "Open settings"),
        segment(2.0, 4.0, "Click save"),
        segment(4.0, 6.0, "Close the dialog"),
    ];

    // The middle segment's frame cannot be read
    let extractor = FakeFrameExtractor::failing_at(vec![2.0]);
    let mut builder = RecordingBuilder::default();
    let (steps, failures) = assemble_document(
        &mut builder,
        "Title",
        "Summary",
        &segments,
        &video,
        &frames_dir,
        &extractor,
        5.0,
    )
    .await;

    assert_eq!(steps, 2);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].segment_index, 2);
    assert_eq!(failures[0].start, 2.0);

    // The failing segment is omitted, not left as a gap
    assert_eq!(
        builder.steps,
        vec![
            (1, "Open settings".to_string()),
            (2, "Close the dialog".to_string()),
        ]
    );
}

#[tokio::test]
async fn segment_start_time_drives_frame_extraction() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.md");
    let frames_dir = document::prepare_frames_dir(&output).unwrap();
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![segment(12.5, 14.0, "Open settings")];

    let extractor = FakeFrameExtractor::new();
    let requested = extractor.requested_timestamps.clone();
    let mut builder = RecordingBuilder::default();
    let (steps, failures) = assemble_document(
        &mut builder,
        "Title",
        "Summary",
        &segments,
        &video,
        &frames_dir,
        &extractor,
        5.0,
    )
    .await;

    assert_eq!(steps, 1);
    assert!(failures.is_empty());
    assert_eq!(*requested.lock().unwrap(), vec![12.5]);
    assert_eq!(builder.steps, vec![(1, "Open settings".to_string())]);
}

#[tokio::test]
async fn markdown_run_writes_document_and_retains_frames() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.md");
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![
        segment(0.0, 2.0, "Open settings"),
        segment(2.0, 4.0, "Click save"),
    ];

    let pipeline = make_pipeline(test_config(temp.path()), segments, vec![]);
    let report = pipeline
        .run(&video.to_string_lossy(), &output)
        .await
        .unwrap();

    assert_eq!(report.steps_written, 2);
    assert!(report.failures.is_empty());

    let content = fs_err::read_to_string(&output).unwrap();
    assert!(content.starts_with("# Enrolling a User\n"));
    assert!(content.contains("## Steps\n"));

    // One retained frame per successfully processed step, still on disk
    let frames_dir = document::frames_dir(&output);
    assert!(frames_dir.exists());
    for step in 1..=2 {
        assert!(frames_dir.join(frame_filename(step)).exists());
    }
}

#[tokio::test]
async fn docx_run_embeds_frames_and_discards_scratch_dir() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.docx");
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![segment(0.0, 2.0, "Open settings")];

    let pipeline = make_pipeline(test_config(temp.path()), segments, vec![]);
    let report = pipeline
        .run(&video.to_string_lossy(), &output)
        .await
        .unwrap();

    assert_eq!(report.steps_written, 1);
    assert!(output.exists());
    assert!(!document::scratch_dir(&output).exists());
}

#[tokio::test]
async fn html_run_references_existing_frames_after_postprocess() {
    let temp = tempfile::tempdir().unwrap();
    let templates = temp.path().join("templates");
    fs_err::create_dir_all(&templates).unwrap();
    fs_err::write(
        templates.join("main_template.html"),
        "<html><h1>{{TITLE}}</h1><p>{{SUMMARY}}</p>{{STEPS}}</html>",
    )
    .unwrap();
    fs_err::write(
        templates.join("step_template.html"),
        "<div><h3>Step {{STEP}}</h3><p>{{TEXT}}</p><img src=\"{{IMAGE}}\" width=\"{{WIDTH}}\" alt=\"{{ALT_TEXT}}\"></div>",
    )
    .unwrap();

    let output = temp.path().join("guide.html");
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![segment(0.0, 2.0, "Open settings")];

    let pipeline = make_pipeline(test_config(&templates), segments, vec![]);
    let report = pipeline
        .run(&video.to_string_lossy(), &output)
        .await
        .unwrap();

    assert_eq!(report.steps_written, 1);

    // Every image reference in the artifact resolves to a file that survived
    // postprocess
    let content = fs_err::read_to_string(&output).unwrap();
    assert!(content.contains("src=\"guide_html/frames/frame_1.jpg\""));
    assert!(temp.path().join("guide_html/frames/frame_1.jpg").exists());
}

#[tokio::test]
async fn zero_segments_still_produce_a_document() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.md");
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let pipeline = make_pipeline(test_config(temp.path()), vec![], vec![]);
    let report = pipeline
        .run(&video.to_string_lossy(), &output)
        .await
        .unwrap();

    assert_eq!(report.steps_written, 0);
    assert!(report.failures.is_empty());

    let content = fs_err::read_to_string(&output).unwrap();
    assert!(content.starts_with("# Enrolling a User\n"));
    assert!(content.contains("## Summary\n"));
    assert!(content.contains("## Steps\n"));
}

#[tokio::test]
async fn failed_save_skips_postprocess_and_keeps_scratch_state() {
    let temp = tempfile::tempdir().unwrap();
    // A directory squatting on the output path makes the docx save fail
    let output = temp.path().join("guide.docx");
    fs_err::create_dir_all(&output).unwrap();
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![segment(0.0, 2.0, "Open settings")];

    let pipeline = make_pipeline(test_config(temp.path()), segments, vec![]);
    let result = pipeline.run(&video.to_string_lossy(), &output).await;

    assert!(result.is_err());

    // Postprocess never ran: the docx builder would have removed the scratch
    // directory, so its survival (frame included) shows the save failure
    // kept the state around for diagnosis.
    let frames_dir = document::frames_dir(&output);
    assert!(frames_dir.exists());
    assert!(frames_dir.join(frame_filename(1)).exists());
}

#[tokio::test]
async fn run_completes_despite_every_frame_failing() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.md");
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let segments = vec![segment(0.0, 2.0, "Open settings"), segment(2.0, 4.0, "Click save")];

    let pipeline = make_pipeline(test_config(temp.path()), segments, vec![0.0, 2.0]);
    let report = pipeline
        .run(&video.to_string_lossy(), &output)
        .await
        .unwrap();

    assert_eq!(report.steps_written, 0);
    assert_eq!(report.failures.len(), 2);
    assert!(output.exists());
}

#[tokio::test]
async fn unsupported_extension_fails_before_transcription() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("guide.txt");
    let video = temp.path().join("demo.mp4");
    fs_err::write(&video, b"video").unwrap();

    let transcriber = FakeTranscriber::new(vec![]);
    let transcriber_called = transcriber.called.clone();

    let pipeline = Pipeline::with_collaborators(
        test_config(temp.path()),
        Box::new(transcriber),
        Box::new(FakeSummarizer),
        Box::new(FakeFrameExtractor::new()),
    )
    .unwrap();

    let result = pipeline.run(&video.to_string_lossy(), &output).await;

    assert!(result.is_err());
    assert!(!transcriber_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn mixed_case_pdf_extension_resolves_to_pdf() {
    use vid2doc::document::DocFormat;

    assert_eq!(
        DocFormat::from_output_path(Path::new("report.PDF")).unwrap(),
        DocFormat::Pdf
    );
}
