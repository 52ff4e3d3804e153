use std::path::Path;
use std::process::Command;

use super::bitrate::{AUDIO_BITRATE_KBPS, target_video_kbps};
use super::ffmpeg_info::Toolchain;
use super::options::{AudioCodec, ConvertOptions, DEFAULT_BITRATE_KBPS, Quality, VideoCodec};
use super::types::ConversionJob;
use crate::engine::hardware::GpuVendor;

/// NVENC preset used for constant-quality hardware encodes
const HW_CQ_PRESET: &str = "p5";
/// NVENC preset used for bitrate-driven hardware encodes
const HW_BITRATE_PRESET: &str = "p4";
/// x264/x265/aom preset used for all software encodes
const SW_PRESET: &str = "medium";

fn push(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

fn apply_audio_settings(args: &mut Vec<String>, audio: AudioCodec) {
    match audio {
        AudioCodec::Aac => {
            let bitrate = format!("{}k", AUDIO_BITRATE_KBPS);
            push(args, &["-c:a", "aac", "-b:a", &bitrate]);
        }
        AudioCodec::Pcm => push(args, &["-c:a", "pcm_s16le"]),
        AudioCodec::Flac => push(args, &["-c:a", "flac"]),
        AudioCodec::Copy => push(args, &["-c:a", "copy"]),
    }
}

fn apply_rate_control<F>(
    args: &mut Vec<String>,
    input: &Path,
    encoder: &str,
    gpu: GpuVendor,
    quality: Quality,
    duration_probe: F,
) where
    F: FnOnce(&Path) -> Option<f64>,
{
    push(args, &["-c:v", encoder]);

    let bitrate_kbps = match quality {
        Quality::ConstantQuality(level) => {
            let level = level.to_string();
            if gpu.is_hardware() {
                push(args, &["-rc", "vbr", "-cq", &level, "-preset", HW_CQ_PRESET]);
            } else {
                push(args, &["-crf", &level, "-preset", SW_PRESET]);
            }
            return;
        }
        Quality::Bitrate(kbps) => kbps,
        Quality::TargetSize(mb) => {
            let computed = duration_probe(input)
                .and_then(|duration| target_video_kbps(mb, duration, AUDIO_BITRATE_KBPS));
            match computed {
                Some(kbps) => kbps,
                None => {
                    tracing::warn!(
                        file = %input.display(),
                        "duration unknown, using {} kbit/s instead of target size",
                        DEFAULT_BITRATE_KBPS
                    );
                    DEFAULT_BITRATE_KBPS
                }
            }
        }
    };

    let bitrate = format!("{}k", bitrate_kbps);
    let preset = if gpu.is_hardware() {
        HW_BITRATE_PRESET
    } else {
        SW_PRESET
    };
    push(args, &["-b:v", &bitrate, "-preset", preset]);
}

/// Build the ffmpeg argument list (without the program name or output path)
///
/// `duration_probe` is only called in target-size mode. Never fails: values
/// that can't be used fall back to their defaults.
pub fn build_ffmpeg_args<F>(
    input: &Path,
    options: &ConvertOptions,
    gpu: GpuVendor,
    duration_probe: F,
) -> Vec<String>
where
    F: FnOnce(&Path) -> Option<f64>,
{
    let mut args = gpu.hwaccel_args();

    args.push("-i".to_string());
    args.push(input.to_string_lossy().into_owned());

    // Audio-only copies the video stream, and a copied stream can't be filtered
    let encoder = gpu.encoder_name(options.video);
    match encoder {
        None => push(&mut args, &["-c:v", "copy"]),
        Some(encoder) => apply_rate_control(
            &mut args,
            input,
            encoder,
            gpu,
            options.quality,
            duration_probe,
        ),
    }

    apply_audio_settings(&mut args, options.audio);

    if encoder.is_some() {
        if let Some((width, height)) = options.upscale.dimensions() {
            args.push("-vf".to_string());
            args.push(format!("scale={}:{}:flags=lanczos", width, height));
        }
    }

    args
}

/// Full argument list for a job, ending in `-y <output>`
pub fn build_job_args<F>(job: &ConversionJob, duration_probe: F) -> Vec<String>
where
    F: FnOnce(&Path) -> Option<f64>,
{
    let mut args = build_ffmpeg_args(&job.input_path, &job.options, job.gpu, duration_probe);
    args.push("-y".to_string());
    args.push(job.output_path.to_string_lossy().into_owned());
    args
}

/// Build ffmpeg command for encoding a job
/// Returns the command but does not execute it
pub fn build_ffmpeg_cmd(tools: &Toolchain, job: &ConversionJob) -> Command {
    let mut cmd = Command::new(&tools.ffmpeg);
    cmd.args(build_job_args(job, |path| tools.probe_duration(path)));
    cmd
}

/// Format a command as a shell-safe string for display
pub fn format_ffmpeg_cmd(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<String> = cmd
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    format_args_line(&program, &args)
}

/// Quote a program and its arguments the way a POSIX shell would need them
pub fn format_args_line(program: &str, args: &[String]) -> String {
    let words = std::iter::once(program).chain(args.iter().map(String::as_str));
    shlex::try_join(words).unwrap_or_else(|_| {
        // Only NUL bytes make quoting fail; show the raw words instead
        std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// Whether the argument list asks for a video re-encode (vs. stream copy)
pub fn is_video_reencode(args: &[String]) -> bool {
    args.windows(2)
        .any(|pair| pair[0] == "-c:v" && pair[1] != "copy")
}
