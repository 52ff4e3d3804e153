//! Batch video conversion through ffmpeg with GPU encoder selection.
//!
//! The [`engine`] module holds everything that doesn't talk to a terminal:
//! GPU detection, duration probing, argument building, output naming and the
//! background conversion worker. [`config`] persists the default option set.

pub mod config;
pub mod engine;
