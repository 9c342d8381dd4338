use anyhow::{Context, Result};
use async_trait::async_trait;
use docx_rs::{Docx, Paragraph, Pic, Run, Style, StyleType};
use std::path::Path;

use super::DocumentBuilder;

/// English Metric Units per inch, the unit docx uses for image extents
const EMU_PER_INCH: f64 = 914_400.0;

/// Word-processor document builder with frames embedded inline
pub struct DocxBuilder {
    paragraphs: Vec<Paragraph>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            paragraphs: Vec::new(),
        }
    }

    fn heading(text: &str, style: &str) -> Paragraph {
        Paragraph::new()
            .add_run(Run::new().add_text(text))
            .style(style)
    }

    /// Load an image and scale it to the requested display width, keeping
    /// the source aspect ratio.
    fn load_picture(frame_path: &Path, image_width_inches: f64) -> Result<Pic> {
        let bytes = fs_err::read(frame_path)
            .with_context(|| format!("Failed to read frame image {}", frame_path.display()))?;

        // Decode from the bytes rather than trusting the extension; this also
        // rejects corrupt frames before they reach the docx writer.
        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("Invalid frame image {}", frame_path.display()))?;

        let width_emu = image_width_inches * EMU_PER_INCH;
        let height_emu = width_emu * f64::from(decoded.height()) / f64::from(decoded.width().max(1));

        Ok(Pic::new(&bytes).size(width_emu as u32, height_emu as u32))
    }
}

impl Default for DocxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentBuilder for DocxBuilder {
    fn add_title(&mut self, title: &str) {
        self.paragraphs.push(Self::heading(title, "Heading1"));
    }

    fn add_summary(&mut self, summary: &str) {
        self.paragraphs.push(Self::heading("Summary", "Heading2"));
        self.paragraphs
            .push(Paragraph::new().add_run(Run::new().add_text(summary)));
    }

    fn add_steps_heading(&mut self) {
        self.paragraphs.push(Self::heading("Steps", "Heading2"));
    }

    fn add_step(
        &mut self,
        text: &str,
        frame_path: &Path,
        _step_number: usize,
        image_width_inches: f64,
    ) -> Result<()> {
        let picture = Self::load_picture(frame_path, image_width_inches)?;

        self.paragraphs
            .push(Paragraph::new().add_run(Run::new().add_text(text)));
        self.paragraphs
            .push(Paragraph::new().add_run(Run::new().add_image(picture)));

        Ok(())
    }

    async fn save(&mut self, output_path: &Path) -> Result<()> {
        tracing::debug!("Writing docx to {}", output_path.display());

        let mut docx = Docx::new()
            .add_style(
                Style::new("Heading1", StyleType::Paragraph)
                    .name("Heading 1")
                    .size(32)
                    .bold(),
            )
            .add_style(
                Style::new("Heading2", StyleType::Paragraph)
                    .name("Heading 2")
                    .size(26)
                    .bold(),
            );

        for paragraph in self.paragraphs.drain(..) {
            docx = docx.add_paragraph(paragraph);
        }

        let file = fs_err::File::create(output_path)
            .with_context(|| format!("Failed to create {}", output_path.display()))?;

        docx.build()
            .pack(file)
            .with_context(|| format!("Failed to write docx to {}", output_path.display()))?;

        Ok(())
    }

    async fn postprocess(&mut self, output_path: &Path) -> Result<()> {
        // Frames are embedded in the document, so the scratch dir goes
        super::remove_scratch_dir(output_path)
    }
}
