use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::DocumentBuilder;

/// Markdown builder accumulating lines in memory. Frames stay on disk and are
/// referenced by relative path, so the scratch directory is retained after
/// postprocess.
pub struct MarkdownBuilder {
    lines: Vec<String>,
    output_path: PathBuf,
}

impl MarkdownBuilder {
    pub fn new(output_path: &Path) -> Self {
        Self {
            lines: Vec::new(),
            output_path: output_path.to_path_buf(),
        }
    }

    fn add_heading(&mut self, text: &str, level: usize) {
        self.lines.push(format!("{} {}\n", "#".repeat(level), text));
    }

    fn add_paragraph(&mut self, text: &str) {
        self.lines.push(format!("{text}\n"));
    }
}

#[async_trait]
impl DocumentBuilder for MarkdownBuilder {
    fn add_title(&mut self, title: &str) {
        self.add_heading(title, 1);
    }

    fn add_summary(&mut self, summary: &str) {
        self.add_heading("Summary", 2);
        self.add_paragraph(summary);
    }

    fn add_steps_heading(&mut self) {
        self.add_heading("Steps", 2);
    }

    fn add_step(
        &mut self,
        text: &str,
        frame_path: &Path,
        step_number: usize,
        image_width_inches: f64,
    ) -> Result<()> {
        // The saved document references this file, so it has to be there now
        if !frame_path.exists() {
            anyhow::bail!("Frame image does not exist: {}", frame_path.display());
        }

        let image_ref = super::relative_frame_ref(&self.output_path, frame_path);
        let width_px = (image_width_inches * 96.0).round() as u32;

        self.add_paragraph(text);
        self.lines.push(format!(
            "<img src=\"{image_ref}\" width=\"{width_px}\" alt=\"Image {step_number}\" />\n"
        ));

        Ok(())
    }

    async fn save(&mut self, output_path: &Path) -> Result<()> {
        tracing::debug!("Writing markdown to {}", output_path.display());

        fs_err::write(output_path, self.lines.concat())
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        Ok(())
    }

    async fn postprocess(&mut self, _output_path: &Path) -> Result<()> {
        // The document references frames by relative path; deleting the
        // scratch directory would break the artifact.
        tracing::debug!("Retaining frames directory for markdown output");
        Ok(())
    }
}
