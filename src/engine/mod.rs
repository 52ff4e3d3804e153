// Core conversion engine - independent of the front-end

pub mod core;
pub mod hardware;
pub mod worker;

pub use core::*;
pub use hardware::{GpuVendor, classify_adapters, detect_gpu};
pub use worker::{BatchError, BatchEvent, BatchSession, BatchState, BatchSummary, CancelToken};
