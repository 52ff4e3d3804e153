//! Output naming: container choice, target directory, and collision-free paths.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::options::ConvertOptions;
use super::types::ConversionJob;
use crate::engine::hardware::GpuVendor;

/// Suffix appended to a file stem when the plain name is taken
pub const CONVERTED_SUFFIX: &str = "_converted";

/// Container extension for an option set: mkv when the audio codec needs it, else mp4
pub fn output_extension(options: &ConvertOptions) -> &'static str {
    if options.audio.needs_matroska() {
        "mkv"
    } else {
        "mp4"
    }
}

/// Return `path` if it is free, else `<stem>_converted<ext>`, else
/// `<stem>_converted(N)<ext>` for the smallest free N >= 1
///
/// This is a plain existence check; another writer can still race us.
pub fn make_unique_path(path: &Path) -> PathBuf {
    make_unique_path_with(path, |p| p.exists())
}

/// Same as [`make_unique_path`] with a caller-supplied "is this name taken" check
pub fn make_unique_path_with<F>(path: &Path, mut is_taken: F) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    if !is_taken(path) {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let candidate = parent.join(format!("{stem}{CONVERTED_SUFFIX}{suffix}"));
    if !is_taken(&candidate) {
        return candidate;
    }

    let mut counter: u64 = 1;
    loop {
        let candidate = parent.join(format!("{stem}{CONVERTED_SUFFIX}({counter}){suffix}"));
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Directory containing `path`, `.` for bare file names
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Name of the dated folder used when no directory was chosen
pub fn dated_folder_name(today: NaiveDate) -> String {
    format!("converted_{}", today.format("%Y-%m-%d"))
}

fn ensure_dir(dir: &Path, create_dirs: bool) -> bool {
    if !create_dirs {
        return true;
    }
    match std::fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create output directory");
            false
        }
    }
}

/// Decide where the output for `input` goes
///
/// Order: explicit target directory (if it can be created), then the
/// source directory when `save_in_source` is set, then a dated folder next
/// to the first file of the batch. With `create_dirs` unset nothing is
/// created and every choice is taken as usable.
pub fn resolve_output_dir(
    input: &Path,
    first_input: &Path,
    options: &ConvertOptions,
    today: NaiveDate,
    create_dirs: bool,
) -> PathBuf {
    if let Some(target) = &options.target_dir {
        let target = expand_home(target);
        if ensure_dir(&target, create_dirs) {
            return target;
        }
    }

    if options.save_in_source {
        return parent_dir(input);
    }

    let dated = parent_dir(first_input).join(dated_folder_name(today));
    if ensure_dir(&dated, create_dirs) {
        dated
    } else {
        parent_dir(input)
    }
}

/// Plan a batch: one job per input with output paths that collide neither
/// with existing files nor with each other
pub fn plan_batch(
    files: &[PathBuf],
    options: &ConvertOptions,
    gpu: GpuVendor,
    today: NaiveDate,
    create_dirs: bool,
) -> Vec<ConversionJob> {
    let Some(first) = files.first() else {
        return Vec::new();
    };

    let ext = output_extension(options);
    let mut reserved: HashSet<PathBuf> = HashSet::new();
    let mut jobs = Vec::with_capacity(files.len());

    for input in files {
        let dir = resolve_output_dir(input, first, options, today, create_dirs);
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let tentative = dir.join(format!("{stem}.{ext}"));

        let output = make_unique_path_with(&tentative, |p| {
            p.exists() || reserved.contains(p) || p == input.as_path()
        });
        reserved.insert(output.clone());

        jobs.push(ConversionJob::new(
            input.clone(),
            output,
            options.clone(),
            gpu,
        ));
    }

    jobs
}
