use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::options::ConvertOptions;
use crate::engine::hardware::GpuVendor;

/// One file of a batch: where it comes from, where it goes, and the settings
/// that were in effect when the batch was planned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub options: ConvertOptions,
    /// Vendor resolved from `options.gpu` at planning time
    pub gpu: GpuVendor,
}

impl ConversionJob {
    pub fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        options: ConvertOptions,
        gpu: GpuVendor,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path,
            output_path,
            options,
            gpu,
        }
    }

    /// Input file name for log lines
    pub fn display_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }
}

/// Parser for ffmpeg's human-readable stats lines
///
/// ffmpeg reports `time=HH:MM:SS.ff` in every stats line; everything else on
/// the line is ignored.
#[derive(Debug, Default, Clone)]
pub struct ProgressParser {
    /// Latest encoded position in seconds
    pub out_time_s: f64,
    /// Whether any `time=` token has been seen yet
    pub seen_time: bool,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single output line, returning the encoded position if present
    pub fn parse_line(&mut self, line: &str) -> Option<f64> {
        let secs = parse_time_token(line)?;
        self.out_time_s = secs;
        self.seen_time = true;
        Some(secs)
    }

    /// Fraction of `duration_s` encoded so far, clamped to [0, 1]
    pub fn fraction(&self, duration_s: f64) -> f64 {
        progress_fraction(self.out_time_s, duration_s)
    }
}

/// Find a `time=HH:MM:SS[.fraction]` token and convert it to seconds
///
/// `time=N/A` and malformed values yield `None`.
pub fn parse_time_token(line: &str) -> Option<f64> {
    let mut rest = line;
    while let Some(idx) = rest.find("time=") {
        let preceded_by_word = rest[..idx]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        let value = &rest[idx + "time=".len()..];
        if !preceded_by_word {
            let token = value.split_whitespace().next().unwrap_or("");
            if let Some(secs) = parse_clock(token) {
                return Some(secs);
            }
        }
        rest = value;
    }
    None
}

/// Parse `HH:MM:SS[.fraction]` into seconds
fn parse_clock(token: &str) -> Option<f64> {
    let mut parts = token.split(':');
    let hours = parts.next()?;
    let minutes = parts.next()?;
    let seconds = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || !all_digits(minutes) {
        return None;
    }
    let (whole, frac) = seconds.split_once('.').unwrap_or((seconds, ""));
    if !all_digits(whole) || !(frac.is_empty() || all_digits(frac)) {
        return None;
    }

    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// `elapsed / duration` clamped to [0, 1]; zero for a non-positive duration
pub fn progress_fraction(elapsed_s: f64, duration_s: f64) -> f64 {
    if duration_s > 0.0 && elapsed_s.is_finite() {
        (elapsed_s / duration_s).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Whole-batch fraction from finished files and the current file's fraction
pub fn overall_fraction(completed_files: usize, current_fraction: f64, total_files: usize) -> f64 {
    if total_files == 0 {
        return 0.0;
    }
    ((completed_files as f64 + current_fraction) / total_files as f64).clamp(0.0, 1.0)
}
