//! Stage progress reporting.
//!
//! A capture runs through a handful of stages. [`ProgressCallback`] receives a
//! [`ProgressInfo`] snapshot as each stage completes; the plugin binary turns
//! these into host progress lines.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use imagecapture::{CaptureConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {:.0}%", info.stage, info.fraction * 100.0);
//!     }
//! }
//!
//! let config = CaptureConfig::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// The stage a capture has just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CaptureStage {
    /// The scene record was fetched from the host.
    SceneLookup,
    /// A collision-free output path was chosen.
    OutputNaming,
    /// The frame was decoded, normalized, and written.
    FrameExtraction,
    /// The host was asked to rescan the output folder.
    LibraryRescan,
    /// The new image was tagged and attached to the scene's gallery.
    ImageRegistration,
}

/// A snapshot of capture progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Stage that just completed.
    pub stage: CaptureStage,
    /// Stages completed so far.
    pub current: u32,
    /// Stages planned for this capture.
    pub total: u32,
    /// `current / total`, in `0.0..=1.0`.
    pub fraction: f32,
    /// Wall-clock time since the capture started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates during a capture.
///
/// Progress callbacks are infallible: they observe but cannot halt the
/// capture.
pub trait ProgressCallback: Send + Sync {
    /// Called once per completed stage.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. This is the default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Counts completed stages and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u32,
    current: u32,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u32) -> Self {
        Self {
            callback,
            total: total.max(1),
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record `stage` as done and notify the callback.
    pub(crate) fn advance(&mut self, stage: CaptureStage) {
        self.current = (self.current + 1).min(self.total);
        let info = ProgressInfo {
            stage,
            current: self.current,
            total: self.total,
            fraction: self.current as f32 / self.total as f32,
            elapsed: self.start_time.elapsed(),
        };
        self.callback.on_progress(&info);
    }
}
