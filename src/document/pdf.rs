use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{DocumentBuilder, DocxBuilder};
use crate::Vid2DocError;

/// Fixed-layout builder: accumulates through a wrapped [`DocxBuilder`] and
/// converts the intermediate docx to pdf with headless LibreOffice at save
/// time.
pub struct PdfBuilder {
    inner: DocxBuilder,
    soffice_path: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_soffice_path("soffice")
    }

    /// Use a specific LibreOffice binary instead of `soffice` from PATH
    pub fn with_soffice_path(soffice_path: impl Into<String>) -> Self {
        Self {
            inner: DocxBuilder::new(),
            soffice_path: soffice_path.into(),
        }
    }

    /// Convert a docx file to pdf using LibreOffice
    async fn convert_docx_to_pdf(&self, docx_path: &Path, pdf_path: &Path) -> Result<()> {
        let out_dir = pdf_path.parent().unwrap_or_else(|| Path::new("."));

        tracing::info!(
            "Converting {} to {} with LibreOffice",
            docx_path.display(),
            pdf_path.display()
        );

        let output = Command::new(&self.soffice_path)
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(out_dir)
            .arg(docx_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to spawn soffice; ensure LibreOffice is installed and on PATH")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(
                Vid2DocError::ConversionFailed(format!("LibreOffice: {}", error.trim())).into(),
            );
        }

        // LibreOffice names the result after the input stem, so move it onto
        // the requested path when they differ (e.g. mixed-case extensions).
        let generated = out_dir.join(format!(
            "{}.pdf",
            docx_path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("output")
        ));

        if !generated.exists() {
            return Err(Vid2DocError::ConversionFailed(format!(
                "LibreOffice reported success but produced no file at {}",
                generated.display()
            ))
            .into());
        }

        if generated != pdf_path {
            fs_err::rename(&generated, pdf_path)?;
        }

        Ok(())
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentBuilder for PdfBuilder {
    fn add_title(&mut self, title: &str) {
        self.inner.add_title(title);
    }

    fn add_summary(&mut self, summary: &str) {
        self.inner.add_summary(summary);
    }

    fn add_steps_heading(&mut self) {
        self.inner.add_steps_heading();
    }

    fn add_step(
        &mut self,
        text: &str,
        frame_path: &Path,
        step_number: usize,
        image_width_inches: f64,
    ) -> Result<()> {
        self.inner
            .add_step(text, frame_path, step_number, image_width_inches)
    }

    async fn save(&mut self, output_path: &Path) -> Result<()> {
        let temp_docx = output_path.with_extension("docx");

        self.inner.save(&temp_docx).await?;

        let result = self.convert_docx_to_pdf(&temp_docx, output_path).await;

        // The intermediate docx never outlives save, whether or not the
        // conversion succeeded.
        if temp_docx.exists() {
            fs_err::remove_file(&temp_docx)?;
        }

        result
    }

    async fn postprocess(&mut self, output_path: &Path) -> Result<()> {
        self.inner.postprocess(output_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_conversion_leaves_no_intermediate_docx() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("guide.pdf");

        // A soffice binary that cannot be spawned makes the conversion fail
        // after the intermediate docx has been written.
        let mut builder = PdfBuilder::with_soffice_path(
            temp.path().join("soffice-not-here").to_string_lossy(),
        );
        builder.add_title("Enrolling a User");
        builder.add_summary("How to enroll.");

        let result = builder.save(&output).await;

        assert!(result.is_err());
        assert!(!output.with_extension("docx").exists());
        assert!(!output.exists());
    }
}
