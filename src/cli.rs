use clap::{Args, Parser, Subcommand};
use gpuconv::engine::{AudioCodec, GpuPreference, QualityMode, Upscale, VideoCodec};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gpuconv")]
#[command(about = "Batch video converter for ffmpeg with GPU encoders", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub convert: ConvertArgs,

    /// Print ffmpeg's own output while converting
    #[arg(long)]
    pub show_output: bool,

    /// Read settings from this file instead of the default config location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (info level; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Conversion settings; anything left out comes from the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Video files or directories to convert
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Encoder family: auto, nvidia, amd, intel, cpu
    #[arg(long)]
    pub gpu: Option<GpuPreference>,

    /// Video codec: h264, h265, av1, audio-only
    #[arg(long)]
    pub video: Option<VideoCodec>,

    /// Audio codec: aac, pcm, flac, copy
    #[arg(long)]
    pub audio: Option<AudioCodec>,

    /// Rate control: cq, bitrate (kbit/s), size (MB)
    #[arg(long)]
    pub quality: Option<QualityMode>,

    /// Value for the rate control mode (defaults: cq 23, bitrate 5000, size 700)
    #[arg(long, allow_hyphen_values = true)]
    pub value: Option<String>,

    /// Scale to a fixed resolution: original, 720p, 1080p, 1440p, 2160p
    #[arg(long)]
    pub upscale: Option<Upscale>,

    /// Output directory (default: converted_<date> next to the first input)
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Write outputs next to their source files
    #[arg(long)]
    pub save_in_source: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check if ffmpeg and ffprobe are installed
    CheckFfmpeg,

    /// Show the detected graphics adapter and which encoders ffmpeg offers for it
    DetectGpu,

    /// Probe a video file to get its duration
    Probe {
        /// Path to the video file
        file: PathBuf,
    },

    /// Show the planned outputs and ffmpeg commands without converting
    DryRun {
        #[command(flatten)]
        convert: ConvertArgs,

        /// Print the planned jobs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
