// Tests for output directory selection and collision-free naming across a batch

use chrono::NaiveDate;
use gpuconv::engine::{
    AudioCodec, ConvertOptions, GpuVendor, make_unique_path, plan_batch,
};
use std::path::PathBuf;

use crate::common::{touch, visible_tempdir};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 12).unwrap()
}

#[test]
fn test_default_goes_to_dated_folder_next_to_first_file() {
    let dir = visible_tempdir();
    let a = touch(&dir.path().join("a.mp4"));
    let b = touch(&dir.path().join("b.mov"));

    let jobs = plan_batch(&[a, b], &ConvertOptions::default(), GpuVendor::Cpu, day(), true);

    let out_dir = dir.path().join("converted_2025-12-12");
    assert!(out_dir.is_dir(), "dated folder should be created");
    assert_eq!(jobs[0].output_path, out_dir.join("a.mp4"));
    assert_eq!(jobs[1].output_path, out_dir.join("b.mp4"));
}

#[test]
fn test_dry_planning_creates_nothing() {
    let dir = visible_tempdir();
    let a = touch(&dir.path().join("a.mp4"));

    let jobs = plan_batch(&[a], &ConvertOptions::default(), GpuVendor::Cpu, day(), false);

    let out_dir = dir.path().join("converted_2025-12-12");
    assert!(!out_dir.exists());
    assert_eq!(jobs[0].output_path, out_dir.join("a.mp4"));
}

#[test]
fn test_save_in_source_uses_each_files_directory() {
    let dir = visible_tempdir();
    let a = touch(&dir.path().join("one").join("clip.mp4"));
    let b = touch(&dir.path().join("two").join("clip.mkv"));

    let options = ConvertOptions {
        save_in_source: true,
        ..ConvertOptions::default()
    };
    let jobs = plan_batch(&[a, b], &options, GpuVendor::Cpu, day(), true);

    // Same name as the input, so the _converted suffix kicks in for the mp4
    assert_eq!(
        jobs[0].output_path,
        dir.path().join("one").join("clip_converted.mp4")
    );
    assert_eq!(jobs[1].output_path, dir.path().join("two").join("clip.mp4"));
}

#[test]
fn test_target_dir_wins_over_save_in_source() {
    let dir = visible_tempdir();
    let input = touch(&dir.path().join("src").join("clip.mp4"));
    let target = dir.path().join("out").join("nested");

    let options = ConvertOptions {
        target_dir: Some(target.clone()),
        save_in_source: true,
        ..ConvertOptions::default()
    };
    let jobs = plan_batch(&[input], &options, GpuVendor::Cpu, day(), true);

    assert!(target.is_dir());
    assert_eq!(jobs[0].output_path, target.join("clip.mp4"));
}

#[test]
fn test_same_stem_in_one_batch_gets_distinct_outputs() {
    let dir = visible_tempdir();
    let a = touch(&dir.path().join("x").join("clip.mp4"));
    let b = touch(&dir.path().join("y").join("clip.mov"));
    let c = touch(&dir.path().join("z").join("clip.avi"));
    let target = dir.path().join("out");

    let options = ConvertOptions {
        target_dir: Some(target.clone()),
        ..ConvertOptions::default()
    };
    let jobs = plan_batch(&[a, b, c], &options, GpuVendor::Cpu, day(), true);

    let outputs: Vec<PathBuf> = jobs.iter().map(|j| j.output_path.clone()).collect();
    assert_eq!(
        outputs,
        vec![
            target.join("clip.mp4"),
            target.join("clip_converted.mp4"),
            target.join("clip_converted(1).mp4"),
        ]
    );
}

#[test]
fn test_existing_outputs_are_never_overwritten() {
    let dir = visible_tempdir();
    let target = dir.path().join("out");
    touch(&target.join("clip.mkv"));
    touch(&target.join("clip_converted.mkv"));
    let input = touch(&dir.path().join("clip.mp4"));

    let options = ConvertOptions {
        audio: AudioCodec::Flac,
        target_dir: Some(target.clone()),
        ..ConvertOptions::default()
    };
    let jobs = plan_batch(&[input], &options, GpuVendor::Nvidia, day(), true);

    assert_eq!(jobs[0].output_path, target.join("clip_converted(1).mkv"));
    assert_eq!(jobs[0].gpu, GpuVendor::Nvidia);
}

#[test]
fn test_unique_path_counter_skips_taken_slots() {
    let dir = visible_tempdir();
    let path = dir.path().join("movie.mp4");
    touch(&path);
    touch(&dir.path().join("movie_converted.mp4"));
    touch(&dir.path().join("movie_converted(1).mp4"));
    touch(&dir.path().join("movie_converted(3).mp4"));

    assert_eq!(
        make_unique_path(&path),
        dir.path().join("movie_converted(2).mp4")
    );
}
