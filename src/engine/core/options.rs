//! User-selectable conversion options.
//!
//! Every enum here parses from the short names used on the command line and
//! in the config file, and serializes back to the same names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::hardware::GpuVendor;

/// Default constant-quality level
pub const DEFAULT_CQ: u32 = 23;
/// Default video bitrate in kbit/s
pub const DEFAULT_BITRATE_KBPS: u32 = 5000;
/// Default target size in megabytes
pub const DEFAULT_TARGET_MB: f64 = 700.0;

/// Error for option names that don't map to a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl UnknownOption {
    fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Which encoder family to use: detect it, or force one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPreference {
    #[default]
    Auto,
    Nvidia,
    Amd,
    Intel,
    Cpu,
}

impl GpuPreference {
    /// Resolve to a concrete vendor, running hardware detection for `Auto`
    pub fn resolve(self) -> GpuVendor {
        self.resolve_with(crate::engine::hardware::detect_gpu)
    }

    /// Resolve with a caller-supplied detector
    pub fn resolve_with<F>(self, detect: F) -> GpuVendor
    where
        F: FnOnce() -> GpuVendor,
    {
        match self {
            Self::Auto => detect(),
            Self::Nvidia => GpuVendor::Nvidia,
            Self::Amd => GpuVendor::Amd,
            Self::Intel => GpuVendor::Intel,
            Self::Cpu => GpuVendor::Cpu,
        }
    }
}

impl FromStr for GpuPreference {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "nvidia" => Ok(Self::Nvidia),
            "amd" => Ok(Self::Amd),
            "intel" => Ok(Self::Intel),
            "cpu" => Ok(Self::Cpu),
            _ => Err(UnknownOption::new(
                "gpu",
                s,
                "auto, nvidia, amd, intel, cpu",
            )),
        }
    }
}

/// Optional scaling to a fixed output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Upscale {
    #[default]
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "1440p")]
    Qhd1440,
    #[serde(rename = "2160p")]
    Uhd2160,
}

impl Upscale {
    /// Target width and height, or `None` to keep the source size
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Original => None,
            Self::Hd720 => Some((1280, 720)),
            Self::Hd1080 => Some((1920, 1080)),
            Self::Qhd1440 => Some((2560, 1440)),
            Self::Uhd2160 => Some((3840, 2160)),
        }
    }
}

impl FromStr for Upscale {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" | "none" => Ok(Self::Original),
            "720p" | "1280x720" => Ok(Self::Hd720),
            "1080p" | "1920x1080" => Ok(Self::Hd1080),
            "1440p" | "2560x1440" => Ok(Self::Qhd1440),
            "2160p" | "4k" | "3840x2160" => Ok(Self::Uhd2160),
            _ => Err(UnknownOption::new(
                "upscale target",
                s,
                "original, 720p, 1080p, 1440p, 2160p",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Aac,
    Pcm,
    Flac,
    Copy,
}

impl AudioCodec {
    /// Whether the default mp4 container can't carry this codec
    pub fn needs_matroska(self) -> bool {
        matches!(self, Self::Flac)
    }
}

impl FromStr for AudioCodec {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aac" => Ok(Self::Aac),
            "pcm" => Ok(Self::Pcm),
            "flac" => Ok(Self::Flac),
            "copy" => Ok(Self::Copy),
            _ => Err(UnknownOption::new("audio codec", s, "aac, pcm, flac, copy")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    Av1,
    /// Copy the video stream and only re-encode audio
    AudioOnly,
}

impl FromStr for VideoCodec {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h264" | "h.264" | "avc" => Ok(Self::H264),
            "h265" | "h.265" | "hevc" => Ok(Self::H265),
            "av1" => Ok(Self::Av1),
            "audio-only" | "audio" => Ok(Self::AudioOnly),
            _ => Err(UnknownOption::new(
                "video codec",
                s,
                "h264, h265, av1, audio-only",
            )),
        }
    }
}

/// Rate-control mode name, without its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    #[default]
    Cq,
    Bitrate,
    Size,
}

impl QualityMode {
    /// The value a freshly selected mode starts with
    pub fn default_value(self) -> Quality {
        match self {
            Self::Cq => Quality::ConstantQuality(DEFAULT_CQ),
            Self::Bitrate => Quality::Bitrate(DEFAULT_BITRATE_KBPS),
            Self::Size => Quality::TargetSize(DEFAULT_TARGET_MB),
        }
    }
}

impl FromStr for QualityMode {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cq" | "crf" | "quality" => Ok(Self::Cq),
            "bitrate" | "cbr" => Ok(Self::Bitrate),
            "size" | "target-size" => Ok(Self::Size),
            _ => Err(UnknownOption::new("quality mode", s, "cq, bitrate, size")),
        }
    }
}

impl fmt::Display for QualityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cq => "cq",
            Self::Bitrate => "bitrate",
            Self::Size => "size",
        };
        f.write_str(name)
    }
}

/// Rate control together with its value
///
/// Mode and value live in one variant so they can't disagree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "kebab-case")]
pub enum Quality {
    /// Constant quality level (CRF for software, CQ for hardware encoders)
    ConstantQuality(u32),
    /// Video bitrate in kbit/s
    Bitrate(u32),
    /// Target output size in megabytes (always positive)
    TargetSize(f64),
}

impl Default for Quality {
    fn default() -> Self {
        Self::ConstantQuality(DEFAULT_CQ)
    }
}

impl Quality {
    /// Build from a mode and free-form user input; bad input falls back to
    /// the mode's default value
    pub fn from_raw(mode: QualityMode, raw: &str) -> Self {
        let raw = raw.trim();
        match mode {
            QualityMode::Cq => {
                Self::ConstantQuality(raw.parse::<u32>().unwrap_or(DEFAULT_CQ))
            }
            QualityMode::Bitrate => {
                let kbps = raw
                    .parse::<f64>()
                    .ok()
                    // Anything below 1 kbit/s would truncate to `-b:v 0k`
                    .filter(|v| v.is_finite() && *v >= 1.0 && *v <= u32::MAX as f64)
                    .map(|v| v as u32)
                    .unwrap_or(DEFAULT_BITRATE_KBPS);
                Self::Bitrate(kbps)
            }
            QualityMode::Size => {
                let mb = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .unwrap_or(DEFAULT_TARGET_MB);
                Self::TargetSize(mb)
            }
        }
    }

    pub fn mode(&self) -> QualityMode {
        match self {
            Self::ConstantQuality(_) => QualityMode::Cq,
            Self::Bitrate(_) => QualityMode::Bitrate,
            Self::TargetSize(_) => QualityMode::Size,
        }
    }
}

/// Full option set in effect for a batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub gpu: GpuPreference,
    pub upscale: Upscale,
    pub audio: AudioCodec,
    pub video: VideoCodec,
    pub quality: Quality,
    /// Explicit output directory; `None` means "decide per batch"
    pub target_dir: Option<PathBuf>,
    /// Write outputs next to each source file
    pub save_in_source: bool,
}
