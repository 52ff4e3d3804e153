use crate::cli::{Cli, Commands, ConvertArgs};
use chrono::Local;
use gpuconv::config::{Config, DefaultsConfig};
use gpuconv::engine::{
    self, BatchEvent, BatchSession, BatchState, ConversionJob, ConvertOptions, GpuVendor, Quality,
    Toolchain, VideoCodec, hardware,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status used when the user interrupts a batch
const EXIT_CANCELLED: i32 = 130;

pub fn run(cli: Cli) {
    let config = load_config(cli.config.as_deref());

    // Handle subcommands first
    if let Some(command) = cli.command {
        match command {
            Commands::CheckFfmpeg => handle_check_ffmpeg(&config),
            Commands::DetectGpu => handle_detect_gpu(&config),
            Commands::Probe { file } => handle_probe(&config, &file),
            Commands::DryRun { convert, json } => handle_dry_run(&config, &convert, json),
            Commands::InitConfig => handle_init_config(cli.config.as_deref()),
        }
        return;
    }

    handle_convert(&config, &cli.convert, cli.show_output);
}

fn load_config(explicit: Option<&Path>) -> Config {
    match explicit {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                process::exit(1);
            }
        },
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("Could not load config, using defaults: {:#}", e);
            Config::default()
        }),
    }
}

/// Merge command-line flags over the configured defaults
///
/// Picking a different rate-control mode without `--value` starts from that
/// mode's default instead of reinterpreting the configured value.
pub(crate) fn resolve_options(defaults: &DefaultsConfig, args: &ConvertArgs) -> ConvertOptions {
    let mut options = defaults.to_options();

    if let Some(gpu) = args.gpu {
        options.gpu = gpu;
    }
    if let Some(video) = args.video {
        options.video = video;
    }
    if let Some(audio) = args.audio {
        options.audio = audio;
    }
    if let Some(upscale) = args.upscale {
        options.upscale = upscale;
    }

    let mode = args.quality.unwrap_or(defaults.quality_mode);
    match &args.value {
        Some(value) => options.quality = Quality::from_raw(mode, value),
        None if mode != defaults.quality_mode => options.quality = mode.default_value(),
        None => {}
    }

    if let Some(dir) = &args.target_dir {
        options.target_dir = Some(dir.clone());
    }
    options.save_in_source |= args.save_in_source;
    options
}

/// Collect inputs, resolve options and the encoder, and plan every job
fn plan(config: &Config, args: &ConvertArgs, create_dirs: bool) -> (Vec<ConversionJob>, GpuVendor) {
    let collected = engine::collect_inputs(&args.inputs);
    for path in &collected.missing {
        eprintln!("Warning: {} does not exist, skipping", path.display());
    }
    for path in &collected.skipped {
        tracing::info!(file = %path.display(), "not a video file, skipping");
    }
    if collected.files.is_empty() {
        eprintln!("Error: {}", engine::BatchError::NoInputs);
        process::exit(1);
    }

    let options = resolve_options(&config.defaults, args);
    let gpu = options.gpu.resolve();
    tracing::info!(%gpu, files = collected.files.len(), "planning batch");

    let today = Local::now().date_naive();
    let jobs = engine::plan_batch(&collected.files, &options, gpu, today, create_dirs);
    (jobs, gpu)
}

fn encoder_label(gpu: GpuVendor, video: VideoCodec) -> &'static str {
    gpu.encoder_name(video).unwrap_or("copy")
}

fn warn_if_encoder_missing(tools: &Toolchain, gpu: GpuVendor, video: VideoCodec) {
    if let Some(encoder) = gpu.encoder_name(video) {
        if !hardware::encoder_available(&tools.ffmpeg, encoder) {
            eprintln!(
                "Warning: {} does not list encoder '{}'; conversions will likely fail",
                tools.ffmpeg.display(),
                encoder
            );
        }
    }
}

fn handle_convert(config: &Config, args: &ConvertArgs, show_output: bool) {
    let tools = config.tools.toolchain();
    let (jobs, gpu) = plan(config, args, true);
    let video = jobs.first().map(|j| j.options.video).unwrap_or_default();

    warn_if_encoder_missing(&tools, gpu, video);

    let session = match BatchSession::start(tools, jobs) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    install_interrupt_handler(session.cancel_token());

    println!("Encoder: {} ({})", encoder_label(gpu, video), gpu);

    let mut current = String::new();
    for event in session.events().iter() {
        match event {
            BatchEvent::Started { total } => {
                println!("Converting {} file(s)", total);
            }
            BatchEvent::FileStarted {
                index,
                total,
                input,
                output,
                command,
                ..
            } => {
                current = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| input.display().to_string());
                println!("[{}/{}] {} -> {}", index + 1, total, input.display(), output.display());
                tracing::debug!(%command, "ffmpeg command");
            }
            BatchEvent::EncoderOutput { line, .. } => {
                if show_output {
                    eprintln!("{}", line);
                }
            }
            BatchEvent::Progress {
                file_fraction,
                overall_fraction,
                ..
            } => {
                print!(
                    "\r  {}: {:5.1}%  (overall {:5.1}%)",
                    current,
                    file_fraction * 100.0,
                    overall_fraction * 100.0
                );
                let _ = std::io::stdout().flush();
            }
            BatchEvent::FileFinished { output, .. } => {
                println!("\n  done: {}", output.display());
            }
            BatchEvent::FileFailed { error, .. } => {
                println!();
                eprintln!("  failed: {}", error);
            }
            BatchEvent::Finished(_) => {}
        }
    }

    let summary = match session.wait() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\nError: {}", e);
            process::exit(1);
        }
    };
    match summary.state {
        BatchState::Cancelled => {
            println!(
                "\nCancelled after {} of {} file(s)",
                summary.completed + summary.failed,
                summary.total
            );
            process::exit(EXIT_CANCELLED);
        }
        _ => {
            println!(
                "Finished: {} converted, {} failed",
                summary.completed, summary.failed
            );
            if summary.failed > 0 {
                process::exit(1);
            }
        }
    }
}

/// First Ctrl-C cancels the batch, a second one exits immediately
fn install_interrupt_handler(token: engine::CancelToken) {
    let interrupted = Arc::new(AtomicBool::new(false));
    let result = ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            process::exit(EXIT_CANCELLED);
        }
        eprintln!("\nStopping, press Ctrl-C again to quit immediately...");
        token.cancel();
    });
    if let Err(e) = result {
        tracing::warn!("Could not install Ctrl-C handler: {}", e);
    }
}

fn handle_check_ffmpeg(config: &Config) {
    let tools = config.tools.toolchain();
    match engine::ffmpeg_version(&tools.ffmpeg) {
        Ok(version) => {
            println!("ffmpeg found: {}", version);
            match engine::ffprobe_version(&tools.ffprobe) {
                Ok(probe_version) => {
                    println!("ffprobe found: {}", probe_version);
                    process::exit(0);
                }
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn handle_detect_gpu(config: &Config) {
    let tools = config.tools.toolchain();
    let gpu = engine::detect_gpu();
    println!("Detected: {}", gpu);

    let listing = hardware::ffmpeg_encoders_output(&tools.ffmpeg);
    if listing.is_none() {
        println!("(could not run {} -encoders)", tools.ffmpeg.display());
    }

    for video in [VideoCodec::H264, VideoCodec::H265, VideoCodec::Av1] {
        let Some(encoder) = gpu.encoder_name(video) else {
            continue;
        };
        let status = match &listing {
            Some(listing) if hardware::encoders_list_contains(listing, encoder) => "available",
            Some(_) => "missing",
            None => "unknown",
        };
        println!("  {:<12} {}", encoder, status);
    }
}

fn handle_probe(config: &Config, file: &Path) {
    let tools = config.tools.toolchain();
    match tools.probe_duration(file) {
        Some(duration) => println!("Duration: {:.2} seconds", duration),
        None => {
            eprintln!("Error: could not read duration of {}", file.display());
            process::exit(1);
        }
    }
}

/// One planned job as printed by `dry-run --json`
#[derive(Serialize)]
struct PlannedJob<'a> {
    #[serde(flatten)]
    job: &'a ConversionJob,
    encoder: &'static str,
    command: String,
}

fn handle_dry_run(config: &Config, args: &ConvertArgs, json: bool) {
    let tools = config.tools.toolchain();
    let (jobs, gpu) = plan(config, args, false);

    let planned: Vec<PlannedJob<'_>> = jobs
        .iter()
        .map(|job| PlannedJob {
            job,
            encoder: encoder_label(gpu, job.options.video),
            command: engine::format_ffmpeg_cmd(&engine::build_ffmpeg_cmd(&tools, job)),
        })
        .collect();

    if json {
        match serde_json::to_string_pretty(&planned) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!("Dry run: {} job(s), encoder {} ({})", planned.len(), planned[0].encoder, gpu);
    for entry in &planned {
        println!(
            "- {} -> {}",
            entry.job.input_path.display(),
            entry.job.output_path.display()
        );
        println!("  {}", entry.command);
    }
}

fn handle_init_config(explicit: Option<&Path>) {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => match Config::config_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                process::exit(1);
            }
        },
    };

    if path.exists() {
        match Config::load_from(&path) {
            Ok(cfg) => {
                println!("Config loaded successfully from {}", path.display());
                println!("{:#?}", cfg);
            }
            Err(e) => {
                eprintln!("Config invalid: {:#}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!("Config missing, creating default config...");
    if let Err(err) = Config::default().save_to(&path) {
        eprintln!("Failed to save default config: {:#}", err);
        process::exit(1);
    }
    println!("Default config saved to {}", path.display());
}
