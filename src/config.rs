//! Capture configuration.
//!
//! [`CaptureConfig`] is a builder that carries every operational setting of a
//! capture (decoder backend, output encoding, host follow-up, progress and
//! logging) into the calls that need it. Nothing is read from global state.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use imagecapture::{CaptureConfig, DecoderBackend};
//!
//! let config = CaptureConfig::new()
//!     .with_decoder(DecoderBackend::Subprocess)
//!     .with_jpeg_quality(85)
//!     .with_register(true)
//!     .with_job_poll(10, Duration::from_millis(100));
//! assert_eq!(config.jpeg_quality(), 85);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use log::LevelFilter;

use crate::{
    decoder::{Decoder, DecoderBackend, FfmpegDecoder},
    progress::{NoOpProgress, ProgressCallback},
    subprocess::CommandDecoder,
};

/// Default JPEG quality for captured frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default number of scan-job polls before registration gives up.
pub const DEFAULT_JOB_POLL_ATTEMPTS: u32 = 20;

/// Default base delay between scan-job polls; attempt `n` waits `n` times this.
pub const DEFAULT_JOB_POLL_DELAY: Duration = Duration::from_millis(200);

/// Configuration for a capture.
///
/// All fields have defaults: library decoding, JPEG quality 90, overwrite an
/// existing output, rescan the output folder, do not register the image.
#[derive(Clone)]
pub struct CaptureConfig {
    pub(crate) decoder: DecoderBackend,
    pub(crate) ffprobe_path: PathBuf,
    pub(crate) ffmpeg_path: PathBuf,
    pub(crate) jpeg_quality: u8,
    pub(crate) overwrite: bool,
    pub(crate) rescan: bool,
    pub(crate) register: bool,
    pub(crate) job_poll_attempts: u32,
    pub(crate) job_poll_delay: Duration,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) log_level: LevelFilter,
    pub(crate) log_file: Option<PathBuf>,
}

impl Debug for CaptureConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CaptureConfig")
            .field("decoder", &self.decoder)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("overwrite", &self.overwrite)
            .field("rescan", &self.rescan)
            .field("register", &self.register)
            .field("job_poll_attempts", &self.job_poll_attempts)
            .field("job_poll_delay", &self.job_poll_delay)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .finish_non_exhaustive()
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            decoder: DecoderBackend::Library,
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            overwrite: true,
            rescan: true,
            register: false,
            job_poll_attempts: DEFAULT_JOB_POLL_ATTEMPTS,
            job_poll_delay: DEFAULT_JOB_POLL_DELAY,
            progress: Arc::new(NoOpProgress),
            log_level: LevelFilter::Info,
            log_file: None,
        }
    }

    /// Select the decoder implementation.
    #[must_use]
    pub fn with_decoder(mut self, backend: DecoderBackend) -> Self {
        self.decoder = backend;
        self
    }

    /// Set the executables used by [`DecoderBackend::Subprocess`].
    #[must_use]
    pub fn with_tool_paths(mut self, ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = ffprobe.into();
        self.ffmpeg_path = ffmpeg.into();
        self
    }

    /// Set the JPEG quality of written frames, clamped to `1..=100`.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Control whether an existing file at the output path is replaced.
    ///
    /// With `false` the file is created exclusively, and a capture racing
    /// another one for the same name fails instead of clobbering it.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Control whether the host rescans the output folder after a write.
    #[must_use]
    pub fn with_rescan(mut self, rescan: bool) -> Self {
        self.rescan = rescan;
        self
    }

    /// Control whether the new image is tagged and attached to the scene's
    /// gallery once the rescan finishes. Implies a rescan.
    #[must_use]
    pub fn with_register(mut self, register: bool) -> Self {
        self.register = register;
        self
    }

    /// Set how often, and how patiently, the scan job is polled.
    ///
    /// Attempt `n` (starting at 1) sleeps `n × base_delay` first.
    #[must_use]
    pub fn with_job_poll(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.job_poll_attempts = attempts.max(1);
        self.job_poll_delay = base_delay;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set the most verbose level the plugin logger emits.
    #[must_use]
    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Mirror log lines into a file, truncated when the logger starts.
    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// Selected decoder backend.
    pub fn decoder(&self) -> DecoderBackend {
        self.decoder
    }

    /// JPEG quality of written frames.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Whether an existing output file is replaced.
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Whether the output folder is rescanned after a write.
    pub fn rescan(&self) -> bool {
        self.rescan || self.register
    }

    /// Whether the new image is registered after the rescan.
    pub fn register(&self) -> bool {
        self.register
    }

    /// Most verbose level the plugin logger emits.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Optional log mirror file.
    pub fn log_file(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Build the configured [`Decoder`].
    pub fn build_decoder(&self) -> Box<dyn Decoder> {
        match self.decoder {
            DecoderBackend::Library => Box::new(FfmpegDecoder),
            DecoderBackend::Subprocess => Box::new(CommandDecoder::new(
                self.ffprobe_path.clone(),
                self.ffmpeg_path.clone(),
            )),
        }
    }
}
