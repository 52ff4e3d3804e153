// Cancelling a running batch

use chrono::NaiveDate;
use gpuconv::engine::{
    BatchEvent, BatchSession, BatchState, ConvertOptions, GpuVendor, plan_batch,
};
use std::time::{Duration, Instant};

use crate::common::{fake_tools, touch, visible_tempdir};

#[test]
fn test_cancel_stops_current_file_and_skips_the_rest() {
    let dir = visible_tempdir();
    let ffmpeg = fake_tools::ffmpeg_hanging(dir.path());
    let tools = fake_tools::toolchain(dir.path(), ffmpeg, "60.0");
    let a = touch(&dir.path().join("a.mp4"));
    let b = touch(&dir.path().join("b.mp4"));
    let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    let jobs = plan_batch(&[a, b], &ConvertOptions::default(), GpuVendor::Cpu, day, true);

    let session = BatchSession::start(tools, jobs).expect("session should start");
    let token = session.cancel_token();
    let started = Instant::now();

    let mut events = Vec::new();
    for event in session.events().iter() {
        if matches!(event, BatchEvent::Progress { out_time_s, .. } if out_time_s > 0.0) {
            token.cancel();
        }
        events.push(event);
    }
    let summary = session.wait().expect("worker should not panic");

    assert_eq!(summary.state, BatchState::Cancelled);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.failed, 0);
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "cancellation should not wait for ffmpeg to finish"
    );

    let started_files: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::FileStarted { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(started_files, vec![0], "second file must never start");
    assert!(!events.iter().any(|e| matches!(e, BatchEvent::FileFailed { .. })));
    assert!(matches!(
        events.last(),
        Some(BatchEvent::Finished(s)) if s.state == BatchState::Cancelled
    ));
}

#[test]
fn test_cancel_before_first_file() {
    let dir = visible_tempdir();
    let ffmpeg = fake_tools::ffmpeg_hanging(dir.path());
    let tools = fake_tools::toolchain(dir.path(), ffmpeg, "60.0");
    let a = touch(&dir.path().join("a.mp4"));
    let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    let jobs = plan_batch(&[a], &ConvertOptions::default(), GpuVendor::Cpu, day, true);

    let token = gpuconv::engine::CancelToken::new();
    token.cancel();
    let mut events = Vec::new();
    let summary = gpuconv::engine::worker::run_batch(&tools, &jobs, &token, |e| events.push(e));

    assert_eq!(summary.state, BatchState::Cancelled);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], BatchEvent::Started { total: 1 }));
    assert!(matches!(events[1], BatchEvent::Finished(_)));
}

#[test]
fn test_cancel_after_last_file_keeps_batch_completed() {
    let dir = visible_tempdir();
    let ffmpeg = fake_tools::ffmpeg_with_stats(dir.path(), &[]);
    let tools = fake_tools::toolchain(dir.path(), ffmpeg, "5.0");
    let a = touch(&dir.path().join("a.mp4"));
    let b = touch(&dir.path().join("b.mp4"));
    let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    let jobs = plan_batch(&[a, b], &ConvertOptions::default(), GpuVendor::Cpu, day, true);

    let token = gpuconv::engine::CancelToken::new();
    let late = token.clone();
    let summary = gpuconv::engine::worker::run_batch(&tools, &jobs, &token, |e| {
        if matches!(e, BatchEvent::FileFinished { index: 1, .. }) {
            late.cancel();
        }
    });

    assert!(token.is_cancelled());
    assert_eq!(summary.state, BatchState::Completed);
    assert_eq!(summary.completed, 2);
}
