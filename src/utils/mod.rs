use anyhow::Result;
use std::path::Path;

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Check if a file exists and is readable
pub fn check_file_accessible(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("Path is not a file: {}", path.display());
    }

    // Try to read metadata to check permissions
    std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Cannot access file {}: {}", path.display(), e))?;

    Ok(())
}

/// Check if the current environment has the required external tools
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for frame extraction".to_string());
    }

    if !check_command_available("whisper", "--help").await {
        missing.push("whisper - required for transcription".to_string());
    }

    if !check_command_available("soffice", "--version").await {
        missing.push("soffice (LibreOffice) - required for pdf output".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, probe_arg: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(probe_arg)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_check_file_accessible() {
        let temp = tempfile::tempdir().unwrap();

        let file = temp.path().join("video.mp4");
        fs_err::write(&file, b"data").unwrap();
        assert!(check_file_accessible(&file).is_ok());

        assert!(check_file_accessible(&temp.path().join("missing.mp4")).is_err());
        assert!(check_file_accessible(temp.path()).is_err());
    }
}
