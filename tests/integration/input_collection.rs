// Tests for turning command-line paths into the list of files to convert

use gpuconv::engine::collect_inputs;

use crate::common::{touch, visible_tempdir};

#[test]
fn test_directory_is_walked_recursively_and_sorted() {
    let dir = visible_tempdir();
    let root = dir.path().join("videos");
    touch(&root.join("b.mkv"));
    touch(&root.join("a.mp4"));
    touch(&root.join("season1").join("ep1.MOV"));
    touch(&root.join("notes.txt"));

    let collected = collect_inputs(&[root.clone()]);

    assert_eq!(
        collected.files,
        vec![
            root.join("a.mp4"),
            root.join("b.mkv"),
            root.join("season1").join("ep1.MOV"),
        ]
    );
    assert!(collected.missing.is_empty());
}

#[test]
fn test_hidden_entries_are_ignored() {
    let dir = visible_tempdir();
    let root = dir.path().join("videos");
    touch(&root.join("keep.mp4"));
    touch(&root.join(".partial.mp4"));
    touch(&root.join(".thumbnails").join("preview.mp4"));

    let collected = collect_inputs(&[root.clone()]);
    assert_eq!(collected.files, vec![root.join("keep.mp4")]);

    // Named explicitly, a hidden file is rejected too
    let hidden = root.join(".partial.mp4");
    let collected = collect_inputs(&[hidden.clone()]);
    assert!(collected.files.is_empty());
    assert_eq!(collected.skipped, vec![hidden]);
}

#[test]
fn test_explicit_files_keep_their_order_without_duplicates() {
    let dir = visible_tempdir();
    let second = touch(&dir.path().join("second.avi"));
    let first = touch(&dir.path().join("first.webm"));
    let text = touch(&dir.path().join("readme.txt"));
    let gone = dir.path().join("gone.mp4");

    let collected = collect_inputs(&[
        second.clone(),
        first.clone(),
        second.clone(),
        text.clone(),
        gone.clone(),
    ]);

    assert_eq!(collected.files, vec![second, first]);
    assert_eq!(collected.skipped, vec![text]);
    assert_eq!(collected.missing, vec![gone]);
}

#[test]
fn test_file_and_its_directory_count_once() {
    let dir = visible_tempdir();
    let root = dir.path().join("clips");
    let clip = touch(&root.join("clip.mp4"));

    let collected = collect_inputs(&[clip.clone(), root]);
    assert_eq!(collected.files, vec![clip]);
}
