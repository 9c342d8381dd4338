use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::Vid2DocError;

/// Trait for capturing a single still frame from a video at a timestamp
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract one frame at `timestamp` seconds into `target_dir`, named by
    /// the step number. Returns the path of the written image.
    async fn extract(
        &self,
        video: &Path,
        target_dir: &Path,
        timestamp: f64,
        step_number: usize,
    ) -> Result<PathBuf>;
}

/// Filename for the frame belonging to a given step
pub fn frame_filename(step_number: usize) -> String {
    format!("frame_{step_number}.jpg")
}

/// Frame extractor that shells out to ffmpeg
pub struct FfmpegFrameExtractor {
    ffmpeg_path: String,
}

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(
        &self,
        video: &Path,
        target_dir: &Path,
        timestamp: f64,
        step_number: usize,
    ) -> Result<PathBuf> {
        let frame_path = target_dir.join(frame_filename(step_number));

        tracing::debug!(
            "Extracting frame at {:.2}s to {}",
            timestamp,
            frame_path.display()
        );

        // -ss before -i seeks on the demuxer, which is fast and accurate
        // enough for a still at a segment boundary.
        let output = Command::new(&self.ffmpeg_path)
            .args(["-y", "-ss"])
            .arg(format!("{timestamp:.3}"))
            .arg("-i")
            .arg(video)
            .args(["-frames:v", "1", "-q:v", "2"])
            .arg(&frame_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to spawn ffmpeg")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(Vid2DocError::FrameExtractionFailed(format!(
                "Could not extract frame at {timestamp} seconds: {}",
                error.trim()
            ))
            .into());
        }

        // ffmpeg exits zero but writes nothing when the seek lands past the
        // last frame, so check the artifact exists before handing it on.
        if !frame_path.exists() {
            return Err(Vid2DocError::FrameExtractionFailed(format!(
                "Could not extract frame at {timestamp} seconds: no image was produced"
            ))
            .into());
        }

        Ok(frame_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_filename_uses_step_number() {
        assert_eq!(frame_filename(1), "frame_1.jpg");
        assert_eq!(frame_filename(42), "frame_42.jpg");
    }
}
