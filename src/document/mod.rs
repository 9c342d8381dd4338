use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::Vid2DocError;

pub mod docx;
pub mod html;
pub mod markdown;
pub mod pdf;

pub use docx::DocxBuilder;
pub use html::HtmlBuilder;
pub use markdown::MarkdownBuilder;
pub use pdf::PdfBuilder;

/// Supported output document formats, resolved from the output extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    /// Word-processor document with embedded images (.doc / .docx)
    Docx,
    /// Fixed-layout document produced through an intermediate docx (.pdf)
    Pdf,
    /// Markdown referencing frames left on disk (.md)
    Markdown,
    /// Template-driven html referencing frames left on disk (.html)
    Html,
}

impl DocFormat {
    /// Resolve the format from the output path's extension, case-insensitively.
    /// Unsupported extensions are a configuration error, raised before any
    /// expensive work is attempted.
    pub fn from_output_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "doc" | "docx" => Ok(DocFormat::Docx),
            "pdf" => Ok(DocFormat::Pdf),
            "md" => Ok(DocFormat::Markdown),
            "html" => Ok(DocFormat::Html),
            other => Err(Vid2DocError::UnsupportedFormat(format!(
                "'{other}' (supported: doc, docx, pdf, md, html)"
            ))
            .into()),
        }
    }

    /// Whether this format embeds frames into the artifact (scratch dir is
    /// discarded at postprocess) or references them by relative path (scratch
    /// dir is retained).
    pub fn embeds_frames(&self) -> bool {
        matches!(self, DocFormat::Docx | DocFormat::Pdf)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocFormat::Docx => "docx",
            DocFormat::Pdf => "pdf",
            DocFormat::Markdown => "md",
            DocFormat::Html => "html",
        }
    }
}

impl std::fmt::Display for DocFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-run scratch directory, derived deterministically from the output
/// filename's stem and extension. `guide.md` gets `guide_md` next to it.
pub fn scratch_dir(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    let ext = output_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let dir_name = if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}_{ext}")
    };

    match output_path.parent() {
        Some(parent) => parent.join(dir_name),
        None => PathBuf::from(dir_name),
    }
}

/// Frames subdirectory beneath the scratch directory
pub fn frames_dir(output_path: &Path) -> PathBuf {
    scratch_dir(output_path).join("frames")
}

/// Recreate the frames directory empty, removing any scratch state left by a
/// prior run at the same derived path.
pub fn prepare_frames_dir(output_path: &Path) -> Result<PathBuf> {
    let scratch = scratch_dir(output_path);
    if scratch.exists() {
        fs_err::remove_dir_all(&scratch)?;
    }

    let frames = frames_dir(output_path);
    fs_err::create_dir_all(&frames)?;
    tracing::debug!("Created frames directory at: {}", frames.display());

    Ok(frames)
}

/// Remove the scratch directory, tolerating it already being absent
pub fn remove_scratch_dir(output_path: &Path) -> Result<()> {
    let scratch = scratch_dir(output_path);
    if scratch.exists() {
        fs_err::remove_dir_all(&scratch)?;
        tracing::debug!("Removed scratch directory: {}", scratch.display());
    }
    Ok(())
}

/// Ordered-construction contract shared by all output formats.
///
/// One instance owns one in-memory document for the duration of a single run.
/// Callers invoke `add_title`, `add_summary`, `add_steps_heading` in that
/// order, then any number of `add_step` calls with contiguous 1-based step
/// numbers, then `save` once, then `postprocess` only if `save` succeeded.
#[async_trait]
pub trait DocumentBuilder: Send {
    /// Record the document title at top-level heading rank
    fn add_title(&mut self, title: &str);

    /// Append a "Summary" section heading followed by the summary body
    fn add_summary(&mut self, summary: &str);

    /// Append a "Steps" section heading; a no-op for formats whose templates
    /// render step structure themselves
    fn add_steps_heading(&mut self);

    /// Append one step: its text followed by its frame, tagged with the step
    /// number. A missing frame file surfaces as an error when the builder
    /// emits the image reference.
    fn add_step(
        &mut self,
        text: &str,
        frame_path: &Path,
        step_number: usize,
        image_width_inches: f64,
    ) -> Result<()>;

    /// Serialize the accumulated document to `output_path`
    async fn save(&mut self, output_path: &Path) -> Result<()>;

    /// Format-specific finalization: discard the scratch directory for
    /// formats that embed their frames, retain it for formats that reference
    /// frames by relative path. Must tolerate the directory already being
    /// absent.
    async fn postprocess(&mut self, output_path: &Path) -> Result<()>;
}

/// Instantiate the builder for a resolved format
pub fn builder_for(
    format: DocFormat,
    output_path: &Path,
    config: &Config,
) -> Result<Box<dyn DocumentBuilder>> {
    let builder: Box<dyn DocumentBuilder> = match format {
        DocFormat::Docx => Box::new(DocxBuilder::new()),
        DocFormat::Pdf => Box::new(PdfBuilder::new()),
        DocFormat::Markdown => Box::new(MarkdownBuilder::new(output_path)),
        DocFormat::Html => Box::new(HtmlBuilder::new(
            config.app.templates_dir.clone(),
            output_path,
        )),
    };
    Ok(builder)
}

/// Relative reference from the output document's directory to a frame file,
/// used by formats that leave frames on disk.
pub(crate) fn relative_frame_ref(output_path: &Path, frame_path: &Path) -> String {
    let base = output_path.parent().unwrap_or_else(|| Path::new(""));
    frame_path
        .strip_prefix(base)
        .unwrap_or(frame_path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_formats_case_insensitively() {
        assert_eq!(
            DocFormat::from_output_path(Path::new("report.PDF")).unwrap(),
            DocFormat::Pdf
        );
        assert_eq!(
            DocFormat::from_output_path(Path::new("guide.docx")).unwrap(),
            DocFormat::Docx
        );
        assert_eq!(
            DocFormat::from_output_path(Path::new("guide.doc")).unwrap(),
            DocFormat::Docx
        );
        assert_eq!(
            DocFormat::from_output_path(Path::new("notes.Md")).unwrap(),
            DocFormat::Markdown
        );
        assert_eq!(
            DocFormat::from_output_path(Path::new("page.html")).unwrap(),
            DocFormat::Html
        );
    }

    #[test]
    fn test_rejects_unknown_extension() {
        assert!(DocFormat::from_output_path(Path::new("out.txt")).is_err());
        assert!(DocFormat::from_output_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let path = Path::new("out/report.PDF");
        assert_eq!(
            DocFormat::from_output_path(path).unwrap(),
            DocFormat::from_output_path(path).unwrap()
        );
        assert_eq!(scratch_dir(path), scratch_dir(path));
    }

    #[test]
    fn test_scratch_dir_derivation() {
        assert_eq!(scratch_dir(Path::new("guide.md")), PathBuf::from("guide_md"));
        assert_eq!(
            scratch_dir(Path::new("out/report.PDF")),
            PathBuf::from("out/report_pdf")
        );
        assert_eq!(
            frames_dir(Path::new("guide.md")),
            PathBuf::from("guide_md/frames")
        );
    }

    #[test]
    fn test_prepare_frames_dir_removes_stale_state() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("guide.md");

        let frames = prepare_frames_dir(&output).unwrap();
        fs_err::write(frames.join("frame_1.jpg"), b"stale").unwrap();

        // A second run at the same derived path starts from an empty dir
        let frames = prepare_frames_dir(&output).unwrap();
        assert!(frames.exists());
        assert!(!frames.join("frame_1.jpg").exists());
    }

    #[test]
    fn test_remove_scratch_dir_tolerates_absence() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("guide.docx");
        assert!(remove_scratch_dir(&output).is_ok());
    }

    #[test]
    fn test_relative_frame_ref() {
        let output = Path::new("out/guide.md");
        let frame = Path::new("out/guide_md/frames/frame_3.jpg");
        assert_eq!(relative_frame_ref(output, frame), "guide_md/frames/frame_3.jpg");
    }
}
