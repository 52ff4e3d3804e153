//! Graphics adapter detection and encoder availability

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::Command;

use crate::engine::core::VideoCodec;

/// VAAPI render node used for Intel encodes
pub const VAAPI_RENDER_DEVICE: &str = "/dev/dri/renderD128";

// ============================================================================
// Vendor classification
// ============================================================================

/// Detected (or forced) GPU vendor; decides which encoder family is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    #[default]
    Cpu,
}

impl GpuVendor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nvidia => "NVIDIA",
            Self::Amd => "AMD",
            Self::Intel => "INTEL",
            Self::Cpu => "CPU",
        }
    }

    /// Check if this vendor uses a hardware encoder
    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// FFmpeg encoder name for a codec, or `None` when the video stream is copied
    pub fn encoder_name(&self, codec: VideoCodec) -> Option<&'static str> {
        let (h264, h265, av1) = match self {
            Self::Nvidia => ("h264_nvenc", "hevc_nvenc", "av1_nvenc"),
            Self::Amd => ("h264_amf", "hevc_amf", "av1_amf"),
            Self::Intel => ("h264_vaapi", "hevc_vaapi", "av1_vaapi"),
            Self::Cpu => ("libx264", "libx265", "libaom-av1"),
        };
        match codec {
            VideoCodec::H264 => Some(h264),
            VideoCodec::H265 => Some(h265),
            VideoCodec::Av1 => Some(av1),
            VideoCodec::AudioOnly => None,
        }
    }

    /// Hardware init flags that go before `-i`
    pub fn hwaccel_args(&self) -> Vec<String> {
        let mut args: Vec<&str> = Vec::new();
        match self {
            Self::Amd => {
                args.extend(["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"]);
            }
            Self::Intel => {
                args.extend(["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"]);
                args.extend(["-vaapi_device", VAAPI_RENDER_DEVICE]);
            }
            Self::Nvidia | Self::Cpu => {}
        }
        args.into_iter().map(String::from).collect()
    }
}

impl fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify adapter listing text; first match wins, NVIDIA before AMD before Intel
pub fn classify_adapters(text: &str) -> GpuVendor {
    let lower = text.to_lowercase();
    if lower.contains("nvidia") {
        return GpuVendor::Nvidia;
    }
    if lower.contains("amd") || lower.contains("radeon") || lower.contains("advanced micro devices")
    {
        return GpuVendor::Amd;
    }
    if lower.contains("intel") {
        return GpuVendor::Intel;
    }
    GpuVendor::Cpu
}

/// Keep only VGA / 3D / display controller lines from an `lspci` listing
pub fn display_adapter_lines(lspci_output: &str) -> String {
    lspci_output
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("vga") || lower.contains("3d") || lower.contains("display")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Detect the primary GPU vendor using lspci
///
/// Never fails: a missing or failing lspci counts as "no GPU".
pub fn detect_gpu() -> GpuVendor {
    let output = match Command::new("lspci").output() {
        Ok(out) if out.status.success() => out,
        Ok(out) => {
            tracing::debug!(status = %out.status, "lspci failed, assuming CPU encoding");
            return GpuVendor::Cpu;
        }
        Err(e) => {
            tracing::debug!(error = %e, "lspci not available, assuming CPU encoding");
            return GpuVendor::Cpu;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let vendor = classify_adapters(&display_adapter_lines(&stdout));
    tracing::debug!(%vendor, "classified display adapters");
    vendor
}

// ============================================================================
// Encoder availability
// ============================================================================

/// Raw `ffmpeg -encoders` listing, or `None` if ffmpeg can't be run
pub fn ffmpeg_encoders_output(ffmpeg: &Path) -> Option<String> {
    let output = Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Check an `ffmpeg -encoders` listing for an encoder name
pub fn encoders_list_contains(listing: &str, encoder: &str) -> bool {
    // Lines look like " V....D h264_nvenc           NVIDIA NVENC H.264 encoder"
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(encoder))
}

/// Whether the given ffmpeg binary was built with `encoder`
pub fn encoder_available(ffmpeg: &Path, encoder: &str) -> bool {
    ffmpeg_encoders_output(ffmpeg)
        .map(|listing| encoders_list_contains(&listing, encoder))
        .unwrap_or(false)
}
