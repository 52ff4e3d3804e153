// Background conversion driver: one worker thread, one ffmpeg at a time

use serde::Serialize;
use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

use super::{
    ConversionJob, DEFAULT_DURATION_S, ProgressParser, Toolchain, build_job_args, ffmpeg_version,
    format_args_line, overall_fraction,
};

/// How often the worker wakes up to look at the cancel token while ffmpeg is quiet
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long ffmpeg gets to exit after SIGTERM before it is killed
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Output lines kept for the error message of a failed encode
const ERROR_TAIL_LINES: usize = 5;

/// Errors that keep a batch from starting, or from reporting its result
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no input files selected")]
    NoInputs,

    #[error("ffmpeg not usable at '{path}': {reason}")]
    EncoderMissing { path: PathBuf, reason: String },

    #[error("could not start worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("conversion worker panicked")]
    WorkerPanicked,
}

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
    FailedToStart,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::FailedToStart)
    }
}

/// Final tally of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub state: BatchState,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// Summary for a batch rejected before the worker started
    pub fn not_started(total: usize) -> Self {
        Self {
            state: BatchState::FailedToStart,
            total,
            completed: 0,
            failed: 0,
        }
    }
}

/// Cooperative cancellation handle shared between the front-end and the worker
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Message from the worker to the front-end
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// Worker picked up the batch
    Started { total: usize },

    /// ffmpeg is about to be launched for a file
    FileStarted {
        job_id: Uuid,
        index: usize,
        total: usize,
        input: PathBuf,
        output: PathBuf,
        command: String,
    },

    /// A raw line of ffmpeg output
    EncoderOutput { job_id: Uuid, line: String },

    /// Progress update; both fractions are in [0, 1]
    Progress {
        job_id: Uuid,
        index: usize,
        file_fraction: f64,
        overall_fraction: f64,
        out_time_s: f64,
    },

    /// ffmpeg exited successfully
    FileFinished {
        job_id: Uuid,
        index: usize,
        output: PathBuf,
    },

    /// The file could not be converted; the batch carries on
    FileFailed {
        job_id: Uuid,
        index: usize,
        error: String,
    },

    /// Always the last event of a batch
    Finished(BatchSummary),
}

enum JobOutcome {
    Finished,
    Failed(String),
    Cancelled,
}

/// Check the environment before any file is touched
pub fn preflight(tools: &Toolchain, jobs: &[ConversionJob]) -> Result<(), BatchError> {
    if jobs.is_empty() {
        return Err(BatchError::NoInputs);
    }
    ffmpeg_version(&tools.ffmpeg).map_err(|e| BatchError::EncoderMissing {
        path: tools.ffmpeg.clone(),
        reason: format!("{:#}", e),
    })?;
    Ok(())
}

/// A running batch; owns the worker thread and the event stream
pub struct BatchSession {
    rx: Receiver<BatchEvent>,
    cancel: CancelToken,
    handle: Option<JoinHandle<BatchSummary>>,
}

impl BatchSession {
    /// Validate the environment and start converting `jobs` in the background
    pub fn start(tools: Toolchain, jobs: Vec<ConversionJob>) -> Result<Self, BatchError> {
        preflight(&tools, &jobs)?;

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("gpuconv-worker".to_string())
            .spawn(move || {
                run_batch(&tools, &jobs, &worker_cancel, |event| {
                    let _ = tx.send(event);
                })
            })?;

        Ok(Self {
            rx,
            cancel,
            handle: Some(handle),
        })
    }

    /// Get the receiver for worker events
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.rx
    }

    /// Handle for requesting cancellation from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker to finish and return its summary
    pub fn wait(mut self) -> Result<BatchSummary, BatchError> {
        let handle = self.handle.take().ok_or(BatchError::WorkerPanicked)?;
        handle.join().map_err(|_| {
            tracing::error!("conversion worker panicked");
            BatchError::WorkerPanicked
        })
    }
}

/// Convert `jobs` one after another on the current thread
///
/// Every event goes through `emit`; the last one is always
/// [`BatchEvent::Finished`]. Per-file problems never stop the batch, only
/// `cancel` does.
pub fn run_batch<F>(
    tools: &Toolchain,
    jobs: &[ConversionJob],
    cancel: &CancelToken,
    mut emit: F,
) -> BatchSummary
where
    F: FnMut(BatchEvent),
{
    let total = jobs.len();
    let mut summary = BatchSummary {
        state: BatchState::Running,
        total,
        completed: 0,
        failed: 0,
    };

    tracing::info!(total, "starting conversion batch");
    emit(BatchEvent::Started { total });

    let mut stopped_early = false;
    for (index, job) in jobs.iter().enumerate() {
        if cancel.is_cancelled() {
            stopped_early = true;
            break;
        }

        let done = summary.completed + summary.failed;
        match run_job(tools, job, index, total, done, cancel, &mut emit) {
            JobOutcome::Finished => {
                summary.completed += 1;
                tracing::info!(output = %job.output_path.display(), "finished");
                emit(BatchEvent::FileFinished {
                    job_id: job.id,
                    index,
                    output: job.output_path.clone(),
                });
            }
            JobOutcome::Failed(error) => {
                summary.failed += 1;
                tracing::warn!(file = %job.input_path.display(), %error, "conversion failed");
                emit(BatchEvent::FileFailed {
                    job_id: job.id,
                    index,
                    error,
                });
            }
            JobOutcome::Cancelled => {
                tracing::info!(file = %job.input_path.display(), "conversion cancelled");
                stopped_early = true;
                break;
            }
        }
    }

    // A cancel arriving after the last file finished doesn't undo the batch
    summary.state = if stopped_early {
        BatchState::Cancelled
    } else {
        BatchState::Completed
    };
    tracing::info!(
        state = ?summary.state,
        completed = summary.completed,
        failed = summary.failed,
        "batch finished"
    );
    emit(BatchEvent::Finished(summary.clone()));
    summary
}

fn run_job<F>(
    tools: &Toolchain,
    job: &ConversionJob,
    index: usize,
    total: usize,
    done: usize,
    cancel: &CancelToken,
    emit: &mut F,
) -> JobOutcome
where
    F: FnMut(BatchEvent),
{
    let probed = tools.probe_duration(&job.input_path);
    if probed.is_none() {
        tracing::warn!(
            file = %job.input_path.display(),
            "could not probe duration, progress will be approximate"
        );
    }
    let duration = probed.unwrap_or(DEFAULT_DURATION_S);

    let args = build_job_args(job, |_| probed);
    let command = format_args_line(&tools.ffmpeg.to_string_lossy(), &args);
    tracing::info!(
        file = %job.display_name(),
        index = index + 1,
        total,
        "converting"
    );
    tracing::debug!(%command, "launching ffmpeg");

    emit(BatchEvent::FileStarted {
        job_id: job.id,
        index,
        total,
        input: job.input_path.clone(),
        output: job.output_path.clone(),
        command,
    });
    emit(BatchEvent::Progress {
        job_id: job.id,
        index,
        file_fraction: 0.0,
        overall_fraction: overall_fraction(done, 0.0, total),
        out_time_s: 0.0,
    });

    let mut cmd = Command::new(&tools.ffmpeg);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        // Own process group: a terminal Ctrl-C reaches us, not ffmpeg
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return JobOutcome::Failed(format!("Failed to spawn ffmpeg: {}", e)),
    };

    let (line_tx, line_rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    let mut parser = ProgressParser::new();
    let mut file_fraction = 0.0_f64;
    let mut tail: VecDeque<String> = VecDeque::with_capacity(ERROR_TAIL_LINES);

    loop {
        if cancel.is_cancelled() {
            request_termination(&mut child);
            return JobOutcome::Cancelled;
        }

        match line_rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(line) => {
                if let Some(out_time_s) = parser.parse_line(&line) {
                    file_fraction = file_fraction.max(parser.fraction(duration));
                    emit(BatchEvent::Progress {
                        job_id: job.id,
                        index,
                        file_fraction,
                        overall_fraction: overall_fraction(done, file_fraction, total),
                        out_time_s,
                    });
                }
                if tail.len() == ERROR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.clone());
                emit(BatchEvent::EncoderOutput {
                    job_id: job.id,
                    line,
                });
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = match wait_for_exit(&mut child, cancel) {
        Some(status) => status,
        None => return JobOutcome::Cancelled,
    };

    if status.success() {
        emit(BatchEvent::Progress {
            job_id: job.id,
            index,
            file_fraction: 1.0,
            overall_fraction: overall_fraction(done + 1, 0.0, total),
            out_time_s: parser.out_time_s,
        });
        JobOutcome::Finished
    } else {
        remove_partial_output(job);
        let detail = tail.into_iter().collect::<Vec<_>>().join("\n");
        if detail.is_empty() {
            JobOutcome::Failed(format!("ffmpeg exited with {}", status))
        } else {
            JobOutcome::Failed(format!("ffmpeg exited with {}:\n{}", status, detail))
        }
    }
}

/// Wait for ffmpeg after its pipes closed, still honouring cancellation
fn wait_for_exit(child: &mut Child, cancel: &CancelToken) -> Option<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if cancel.is_cancelled() {
                    request_termination(child);
                    return None;
                }
                thread::sleep(CANCEL_POLL_INTERVAL);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to wait for ffmpeg");
                return child.wait().ok();
            }
        }
    }
}

/// Ask ffmpeg to stop (SIGTERM lets it finalize the container), then kill it
/// if it hasn't exited within the grace period
fn request_termination(child: &mut Child) {
    #[cfg(unix)]
    {
        let pid = child.id() as libc::pid_t;
        // SAFETY: `pid` belongs to a child we own and haven't reaped yet
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }

    let deadline = Instant::now() + TERMINATE_GRACE;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(50)),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
        }
    }
}

fn remove_partial_output(job: &ConversionJob) {
    if job.output_path.is_file() {
        if let Err(e) = std::fs::remove_file(&job.output_path) {
            tracing::debug!(
                output = %job.output_path.display(),
                error = %e,
                "could not remove partial output"
            );
        }
    }
}

/// Forward lines from a pipe; ffmpeg ends stats lines with `\r`, so both
/// `\r` and `\n` terminate a line
fn spawn_line_reader<R>(pipe: R, tx: Sender<String>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = [0u8; 4096];
        let mut pending: Vec<u8> = Vec::new();

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            };
            for &byte in &buf[..n] {
                if byte == b'\n' || byte == b'\r' {
                    if !pending.is_empty() {
                        let line = String::from_utf8_lossy(&pending).into_owned();
                        pending.clear();
                        if tx.send(line).is_err() {
                            return;
                        }
                    }
                } else {
                    pending.push(byte);
                }
            }
        }

        if !pending.is_empty() {
            let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
        }
    });
}
