// Tests for the ffmpeg command assembled for a planned job

use gpuconv::engine::{
    ConversionJob, ConvertOptions, GpuVendor, Quality, Toolchain, Upscale, VideoCodec,
    build_ffmpeg_cmd, format_ffmpeg_cmd,
};
use std::path::PathBuf;

fn job(options: ConvertOptions, gpu: GpuVendor) -> ConversionJob {
    ConversionJob::new(
        PathBuf::from("/media/in/holiday clip.mov"),
        PathBuf::from("/media/out/holiday clip.mp4"),
        options,
        gpu,
    )
}

#[test]
fn test_command_uses_configured_ffmpeg_and_ends_with_output() {
    let tools = Toolchain {
        ffmpeg: PathBuf::from("/opt/ffmpeg/bin/ffmpeg"),
        ffprobe: PathBuf::from("/opt/ffmpeg/bin/ffprobe"),
    };
    let cmd = build_ffmpeg_cmd(&tools, &job(ConvertOptions::default(), GpuVendor::Cpu));

    assert_eq!(cmd.get_program(), "/opt/ffmpeg/bin/ffmpeg");
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert_eq!(args.first().map(String::as_str), Some("-i"));
    assert_eq!(&args[args.len() - 2..], ["-y", "/media/out/holiday clip.mp4"]);
}

#[test]
fn test_display_string_is_shell_quoted() {
    let options = ConvertOptions {
        upscale: Upscale::Hd1080,
        ..ConvertOptions::default()
    };
    let cmd = build_ffmpeg_cmd(&Toolchain::default(), &job(options, GpuVendor::Nvidia));
    let line = format_ffmpeg_cmd(&cmd);

    assert!(line.starts_with("ffmpeg -i '/media/in/holiday clip.mov' -c:v h264_nvenc"));
    assert!(line.contains("-vf 'scale=1920:1080:flags=lanczos'"));
    assert!(line.ends_with("-y '/media/out/holiday clip.mp4'"));
}

#[test]
fn test_unprobeable_target_size_falls_back_to_default_bitrate() {
    let tools = Toolchain {
        ffmpeg: PathBuf::from("ffmpeg"),
        ffprobe: PathBuf::from("/nonexistent/gpuconv-test/ffprobe"),
    };
    let options = ConvertOptions {
        video: VideoCodec::H265,
        quality: Quality::TargetSize(700.0),
        ..ConvertOptions::default()
    };
    let line = format_ffmpeg_cmd(&build_ffmpeg_cmd(&tools, &job(options, GpuVendor::Cpu)));
    assert!(line.contains("-c:v libx265 -b:v 5000k -preset medium"));
}

#[cfg(unix)]
#[test]
fn test_target_size_bitrate_comes_from_ffprobe() {
    use crate::common::{fake_tools, visible_tempdir};

    let dir = visible_tempdir();
    let tools = Toolchain {
        ffmpeg: PathBuf::from("ffmpeg"),
        ffprobe: fake_tools::ffprobe_reporting(dir.path(), "3600.000000"),
    };
    let options = ConvertOptions {
        quality: Quality::TargetSize(700.0),
        ..ConvertOptions::default()
    };
    let line = format_ffmpeg_cmd(&build_ffmpeg_cmd(&tools, &job(options, GpuVendor::Nvidia)));
    assert!(line.contains("-c:v h264_nvenc -b:v 1400k -preset p4"), "{}", line);
}
