use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Duration assumed when probing fails, so progress math never divides by zero
pub const DEFAULT_DURATION_S: f64 = 1.0;

/// Locations of the external ffmpeg tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Toolchain {
    /// Probe a file's duration with this toolchain's ffprobe
    pub fn probe_duration(&self, path: &Path) -> Option<f64> {
        probe_duration(&self.ffprobe, path)
    }
}

fn tool_version(program: &Path) -> Result<String> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {}. Is it installed and in PATH?",
                program.display()
            )
        })?;

    if !output.status.success() {
        anyhow::bail!(
            "{} command failed with status: {}",
            program.display(),
            output.status
        );
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Check if ffmpeg is available and return its version
pub fn ffmpeg_version(ffmpeg: &Path) -> Result<String> {
    tool_version(ffmpeg)
}

/// Check if ffprobe is available and return its version
pub fn ffprobe_version(ffprobe: &Path) -> Result<String> {
    tool_version(ffprobe)
}

/// Probe a video file to get its duration in seconds
///
/// Returns `None` instead of failing when ffprobe is missing, errors out, or
/// prints something that isn't a duration.
pub fn probe_duration(ffprobe: &Path, path: &Path) -> Option<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    let output = match output {
        Ok(out) => out,
        Err(e) => {
            tracing::debug!(error = %e, "ffprobe could not be started");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            file = %path.display(),
            status = %output.status,
            "ffprobe failed"
        );
        return None;
    }

    parse_duration_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's bare duration output (e.g. `"123.456000\n"`)
pub fn parse_duration_output(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}
