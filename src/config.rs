// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{
    AudioCodec, ConvertOptions, GpuPreference, Quality, QualityMode, Toolchain, Upscale,
    VideoCodec,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// ffmpeg binary (name looked up in PATH, or an absolute path)
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,

    /// ffprobe binary (name looked up in PATH, or an absolute path)
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// auto, nvidia, amd, intel or cpu
    #[serde(default)]
    pub gpu: GpuPreference,

    #[serde(default)]
    pub video: VideoCodec,

    #[serde(default)]
    pub audio: AudioCodec,

    #[serde(default)]
    pub upscale: Upscale,

    /// cq, bitrate or size
    #[serde(default)]
    pub quality_mode: QualityMode,

    /// Value for `quality_mode`; empty means the mode's default
    #[serde(default)]
    pub quality_value: String,

    /// Output directory; empty means a dated folder next to the first input
    #[serde(default)]
    pub target_dir: String,

    #[serde(default)]
    pub save_in_source: bool,
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            gpu: GpuPreference::Auto,
            video: VideoCodec::H264,
            audio: AudioCodec::Aac,
            upscale: Upscale::Original,
            quality_mode: QualityMode::Cq,
            quality_value: String::new(),
            target_dir: String::new(),
            save_in_source: false,
        }
    }
}

impl DefaultsConfig {
    /// Option set described by these defaults
    pub fn to_options(&self) -> ConvertOptions {
        let target_dir = self.target_dir.trim();
        ConvertOptions {
            gpu: self.gpu,
            upscale: self.upscale,
            audio: self.audio,
            video: self.video,
            quality: Quality::from_raw(self.quality_mode, &self.quality_value),
            target_dir: (!target_dir.is_empty()).then(|| PathBuf::from(target_dir)),
            save_in_source: self.save_in_source,
        }
    }
}

impl ToolsConfig {
    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("gpuconv")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("gpuconv")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();

            // Try to save the default config, but don't fail if we can't
            // (e.g., if the directory isn't writable)
            if let Err(e) = config.save() {
                tracing::warn!("Could not create default config file: {:#}", e);
                tracing::warn!(
                    "Using built-in defaults. Run 'gpuconv init-config' to create a config file."
                );
            }

            Ok(config)
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save config to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }
}
