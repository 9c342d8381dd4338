use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::utils;

/// Where a run's input video came from
pub enum ResolvedInput {
    /// A local file supplied by the user; never deleted by the pipeline
    Local(PathBuf),

    /// A remote video downloaded into the pipeline's temp directory
    Downloaded(PathBuf),
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(path) => path,
            ResolvedInput::Downloaded(path) => path,
        }
    }
}

/// Check if the input looks like a remote URL rather than a local path
pub fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input argument to a local video file, downloading if remote
pub async fn resolve(input: &str, temp_dir: &Path, quiet: bool) -> Result<ResolvedInput> {
    if is_remote(input) {
        let url = url::Url::parse(input)
            .with_context(|| format!("Invalid input URL: {input}"))?;

        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Input URL must use HTTP or HTTPS protocol");
        }

        let filename = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .unwrap_or("input.mp4");
        let target = temp_dir.join(filename);

        download(input, &target, quiet).await?;
        return Ok(ResolvedInput::Downloaded(target));
    }

    let path = PathBuf::from(input);
    utils::check_file_accessible(&path)?;
    Ok(ResolvedInput::Local(path))
}

/// Download a remote video with progress tracking
async fn download(url: &str, target: &Path, quiet: bool) -> Result<()> {
    tracing::info!("Downloading video to: {}", target.display());

    let response = reqwest::get(url).await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to download video: HTTP {}", response.status());
    }

    let total_size = response.content_length().unwrap_or(0);
    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total_size)
    };
    progress.set_length(total_size);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap(),
    );
    progress.set_message("Downloading video...");

    let mut file = fs_err::File::create(target)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    use futures_util::StreamExt;
    use std::io::Write;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }

    progress.finish_with_message("Download complete");

    Ok(())
}
