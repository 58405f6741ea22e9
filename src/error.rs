//! Error types for the `imagecapture` crate.
//!
//! This module defines [`CaptureError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry enough context (file paths,
//! frame numbers, host messages) that call sites only need to log them.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `imagecapture` operations.
///
/// None of these are fatal to the plugin process: the capture pipeline logs
/// them and reports a failure result instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// The scene (or its video file) could not be found on the host.
    #[error("Scene lookup failed: {0}")]
    Lookup(String),

    /// Stream metadata could not be probed or parsed.
    #[error("Failed to probe {path}: {reason}")]
    Probe {
        /// Video that was probed.
        path: PathBuf,
        /// Underlying reason the probe failed.
        reason: String,
    },

    /// The container has no video stream.
    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),

    /// Seeking to or decoding the requested frame failed.
    #[error("Failed to decode frame {frame_index} of {path}: {reason}")]
    Decode {
        /// Video being decoded.
        path: PathBuf,
        /// Zero-based frame index that was requested.
        frame_index: u64,
        /// Underlying reason decoding failed.
        reason: String,
    },

    /// The output image could not be encoded or written.
    #[error("Failed to write image {path}: {reason}")]
    Encode {
        /// Destination of the image.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// Every capture number for a video prefix is taken.
    #[error("No capture number left after `{prefix}{last}`")]
    NamingExhausted {
        /// Shared prefix of the video's captures.
        prefix: String,
        /// Highest capture number in use.
        last: u64,
    },

    /// The output path already exists and overwriting is disabled.
    #[error("Output already exists: {0}")]
    OutputExists(PathBuf),

    /// A required external executable is not installed.
    #[error("Required tool `{0}` was not found on this system")]
    DependencyMissing(String),

    /// The host API could not be reached or rejected a request.
    #[error("Host API error: {0}")]
    Host(String),

    /// The plugin request was malformed.
    #[error("Invalid plugin request: {0}")]
    InvalidRequest(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// A JSON document could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),
}

impl From<FfmpegError> for CaptureError {
    fn from(error: FfmpegError) -> Self {
        CaptureError::Ffmpeg(error.to_string())
    }
}

impl From<reqwest::Error> for CaptureError {
    fn from(error: reqwest::Error) -> Self {
        CaptureError::Host(error.to_string())
    }
}
