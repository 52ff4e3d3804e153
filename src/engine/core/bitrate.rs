//! Video bitrate needed to hit a target output size.
//!
//! Container overhead is ignored; audio is assumed to run at a fixed
//! bitrate alongside the video stream.

use std::path::Path;

use super::ffmpeg_info::probe_duration;

/// Audio bitrate the size calculation reserves, in kbit/s
pub const AUDIO_BITRATE_KBPS: u32 = 192;

/// Lowest video bitrate the calculation will hand out, in kbit/s
pub const MIN_VIDEO_KBPS: u32 = 300;

/// Video bitrate (kbit/s) that makes `duration_s` of media fill `target_mb`
///
/// `None` when the duration is unknown or not positive.
pub fn target_video_kbps(target_mb: f64, duration_s: f64, audio_kbps: u32) -> Option<u32> {
    if !(duration_s.is_finite() && duration_s > 0.0) {
        return None;
    }
    let total_kbps = target_mb * 8192.0 / duration_s;
    let video_kbps = (total_kbps - audio_kbps as f64).max(MIN_VIDEO_KBPS as f64);
    Some(video_kbps as u32)
}

/// Probe `path` and compute the video bitrate for a target size
pub fn calculate_bitrate_for_target_size(ffprobe: &Path, path: &Path, target_mb: f64) -> Option<u32> {
    let duration = probe_duration(ffprobe, path)?;
    target_video_kbps(target_mb, duration, AUDIO_BITRATE_KBPS)
}
