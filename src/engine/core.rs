mod bitrate;
mod ffmpeg_cmd;
mod ffmpeg_info;
mod options;
mod output;
mod scan;
mod types;

pub use bitrate::{
    AUDIO_BITRATE_KBPS, MIN_VIDEO_KBPS, calculate_bitrate_for_target_size, target_video_kbps,
};
pub use ffmpeg_cmd::{
    build_ffmpeg_args, build_ffmpeg_cmd, build_job_args, format_args_line, format_ffmpeg_cmd,
    is_video_reencode,
};
pub use ffmpeg_info::{
    DEFAULT_DURATION_S, Toolchain, ffmpeg_version, ffprobe_version, parse_duration_output,
    probe_duration,
};
pub use options::{
    AudioCodec, ConvertOptions, DEFAULT_BITRATE_KBPS, DEFAULT_CQ, DEFAULT_TARGET_MB,
    GpuPreference, Quality, QualityMode, UnknownOption, Upscale, VideoCodec,
};
pub use output::{
    CONVERTED_SUFFIX, dated_folder_name, expand_home, make_unique_path, make_unique_path_with,
    output_extension, plan_batch, resolve_output_dir,
};
pub use scan::{
    CollectedInputs, VIDEO_EXTENSIONS, collect_inputs, has_hidden_component, is_video_file,
};
pub use types::{
    ConversionJob, ProgressParser, overall_fraction, parse_time_token, progress_fraction,
};
