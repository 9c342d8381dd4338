use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::DocumentBuilder;
use crate::Vid2DocError;

const MAIN_TEMPLATE: &str = "main_template.html";
const STEP_TEMPLATE: &str = "step_template.html";

/// Html builder that substitutes named placeholders into externally supplied
/// page and step templates. A missing template file is a hard failure; frames
/// stay on disk and are referenced by relative path.
pub struct HtmlBuilder {
    templates_dir: PathBuf,
    output_path: PathBuf,
    title: String,
    summary: String,
    steps_html: Vec<String>,
}

impl HtmlBuilder {
    pub fn new(templates_dir: PathBuf, output_path: &Path) -> Self {
        Self {
            templates_dir,
            output_path: output_path.to_path_buf(),
            title: String::new(),
            summary: String::new(),
            steps_html: Vec::new(),
        }
    }

    fn read_template(&self, name: &str) -> Result<String> {
        let path = self.templates_dir.join(name);
        if !path.exists() {
            return Err(Vid2DocError::TemplateMissing(path).into());
        }
        Ok(fs_err::read_to_string(&path)?)
    }
}

#[async_trait]
impl DocumentBuilder for HtmlBuilder {
    fn add_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn add_summary(&mut self, summary: &str) {
        self.summary = summary.to_string();
    }

    fn add_steps_heading(&mut self) {
        // The page template renders the steps section heading itself
    }

    fn add_step(
        &mut self,
        text: &str,
        frame_path: &Path,
        step_number: usize,
        image_width_inches: f64,
    ) -> Result<()> {
        if !frame_path.exists() {
            anyhow::bail!("Frame image does not exist: {}", frame_path.display());
        }

        let template = self.read_template(STEP_TEMPLATE)?;
        let image_ref = super::relative_frame_ref(&self.output_path, frame_path);
        let width_px = (image_width_inches * 96.0).round() as u32;

        let step_html = template
            .replace("{{STEP}}", &step_number.to_string())
            .replace("{{TEXT}}", text)
            .replace("{{ALT_TEXT}}", &format!("Image {step_number}"))
            .replace("{{IMAGE}}", &image_ref)
            .replace("{{WIDTH}}", &width_px.to_string());

        self.steps_html.push(step_html);
        Ok(())
    }

    async fn save(&mut self, output_path: &Path) -> Result<()> {
        tracing::debug!("Writing html to {}", output_path.display());

        let template = self.read_template(MAIN_TEMPLATE)?;
        let html = template
            .replace("{{TITLE}}", &self.title)
            .replace("{{SUMMARY}}", &self.summary)
            .replace("{{STEPS}}", &self.steps_html.join("\n"));

        fs_err::write(output_path, html)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        Ok(())
    }

    async fn postprocess(&mut self, _output_path: &Path) -> Result<()> {
        // Same non-destructive policy as markdown: the page references the
        // frame files by relative path.
        tracing::debug!("Retaining frames directory for html output");
        Ok(())
    }
}
