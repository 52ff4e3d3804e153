use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Video file extensions accepted as input
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "m4v", "mpg", "mpeg", "webm"];

/// Check if a path has a video file extension
pub fn is_video_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        if let Some(ext_str) = ext.to_str() {
            return VIDEO_EXTENSIONS.contains(&ext_str.to_lowercase().as_str());
        }
    }
    false
}

/// Whether any component of the path is a dotfile / dot-directory
pub fn has_hidden_component(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Inputs gathered from the command line, plus what was rejected
#[derive(Debug, Default)]
pub struct CollectedInputs {
    pub files: Vec<PathBuf>,
    /// Paths that don't exist
    pub missing: Vec<PathBuf>,
    /// Existing files rejected for their extension or a hidden path
    pub skipped: Vec<PathBuf>,
}

/// Expand a list of files and directories into the video files to convert
///
/// Directories are walked recursively without following links. Order is
/// preserved and duplicates are dropped.
pub fn collect_inputs(paths: &[PathBuf]) -> CollectedInputs {
    let mut collected = CollectedInputs::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    let mut accept = |path: PathBuf, collected: &mut CollectedInputs| {
        if has_hidden_component(&path) || !is_video_file(&path) {
            collected.skipped.push(path);
        } else if seen.insert(path.clone()) {
            collected.files.push(path);
        }
    };

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_video_file(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            for file in found {
                accept(file, &mut collected);
            }
        } else if path.is_file() {
            accept(path.clone(), &mut collected);
        } else {
            collected.missing.push(path.clone());
        }
    }

    collected
}
