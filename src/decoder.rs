//! The probing/decoding capability.
//!
//! Everything that touches video bytes goes through [`Decoder`], so the
//! extractor can run against the linked FFmpeg libraries ([`FfmpegDecoder`]),
//! the FFmpeg executables ([`CommandDecoder`](crate::CommandDecoder)), or a
//! scripted fake in tests.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    str::FromStr,
};

use image::DynamicImage;

use crate::{error::CaptureError, metadata::VideoStreamMetadata};

/// Synchronous access to a video's stream metadata and frames.
///
/// Both calls block until the underlying library or process is done; no
/// timeout is applied.
pub trait Decoder {
    /// Probe the first video stream of `path`.
    fn probe(&self, path: &Path) -> Result<VideoStreamMetadata, CaptureError>;

    /// Decode exactly one frame, addressed by zero-based decode index.
    ///
    /// The raster comes back in coded orientation, without applying any
    /// rotation metadata.
    fn decode_frame(&self, path: &Path, frame_index: u64) -> Result<DynamicImage, CaptureError>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str {
        "decoder"
    }
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn probe(&self, path: &Path) -> Result<VideoStreamMetadata, CaptureError> {
        (**self).probe(path)
    }

    fn decode_frame(&self, path: &Path, frame_index: u64) -> Result<DynamicImage, CaptureError> {
        (**self).decode_frame(path, frame_index)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// A [`Decoder`] linked against the FFmpeg libraries through `ffmpeg-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegDecoder;

impl Decoder for FfmpegDecoder {
    fn probe(&self, path: &Path) -> Result<VideoStreamMetadata, CaptureError> {
        crate::probe::probe_video_stream(path)
    }

    fn decode_frame(&self, path: &Path, frame_index: u64) -> Result<DynamicImage, CaptureError> {
        crate::video::decode_frame(path, frame_index)
    }

    fn name(&self) -> &'static str {
        "library"
    }
}

/// Which [`Decoder`] implementation to build from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderBackend {
    /// Linked FFmpeg libraries ([`FfmpegDecoder`]). This is the default.
    #[default]
    Library,
    /// `ffprobe` / `ffmpeg` executables ([`CommandDecoder`](crate::CommandDecoder)).
    Subprocess,
}

impl FromStr for DecoderBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "library" | "lib" | "linked" => Ok(DecoderBackend::Library),
            "subprocess" | "process" | "cli" | "command" => Ok(DecoderBackend::Subprocess),
            other => Err(format!(
                "unsupported decoder backend `{other}` (expected library or subprocess)"
            )),
        }
    }
}

impl Display for DecoderBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DecoderBackend::Library => f.write_str("library"),
            DecoderBackend::Subprocess => f.write_str("subprocess"),
        }
    }
}
