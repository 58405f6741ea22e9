//! Frame extraction.
//!
//! [`extract_frame`] resolves the video's rotation, decodes one frame,
//! normalizes its dimensions, and writes it as a JPEG. Exactly one file is
//! created (or replaced) on success and none on failure.
//!
//! # Example
//!
//! ```no_run
//! use imagecapture::{CaptureConfig, FfmpegDecoder, FrameRequest, extract_frame};
//!
//! let request = FrameRequest::new("/videos/clip.mp4", 120, "/videos/clip_000.jpg");
//! let result = extract_frame(&FfmpegDecoder, &request, &CaptureConfig::new());
//! if result.success {
//!     println!("saved {:?}", result.output_path);
//! }
//! ```

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use image::{DynamicImage, codecs::jpeg::JpegEncoder};

use crate::{
    config::CaptureConfig,
    decoder::Decoder,
    error::CaptureError,
    rotation::{normalize_frame_rotation, probe_rotation},
};

/// One frame to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest {
    /// Source video.
    pub video_path: PathBuf,
    /// Zero-based decode index. Not validated against the video's length.
    pub frame_index: u64,
    /// Destination image.
    pub output_path: PathBuf,
    /// Expected `(width, height)` as catalogued by the host, if known.
    pub resolution_hint: Option<(u32, u32)>,
}

impl FrameRequest {
    /// Create a request without a resolution hint.
    pub fn new(
        video_path: impl Into<PathBuf>,
        frame_index: u64,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video_path: video_path.into(),
            frame_index,
            output_path: output_path.into(),
            resolution_hint: None,
        }
    }

    /// Attach the catalogued resolution.
    #[must_use]
    pub fn with_resolution_hint(mut self, width: u32, height: u32) -> Self {
        self.resolution_hint = Some((width, height));
        self
    }
}

/// Outcome of [`extract_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ExtractionResult {
    /// Whether the frame was written.
    pub success: bool,
    /// Where it was written, on success.
    pub output_path: Option<PathBuf>,
}

impl ExtractionResult {
    fn succeeded(path: PathBuf) -> Self {
        Self {
            success: true,
            output_path: Some(path),
        }
    }

    fn failed() -> Self {
        Self {
            success: false,
            output_path: None,
        }
    }
}

/// Extract, normalize, and write one frame, logging any failure.
///
/// A failed rotation probe aborts the extraction: nothing is written.
pub fn extract_frame<D>(decoder: &D, request: &FrameRequest, config: &CaptureConfig) -> ExtractionResult
where
    D: Decoder + ?Sized,
{
    match try_extract_frame(decoder, request, config) {
        Ok(path) => ExtractionResult::succeeded(path),
        Err(error) => {
            log::error!("Failed to extract frame {}", request.frame_index);
            log::error!("{error}");
            ExtractionResult::failed()
        }
    }
}

/// Fallible form of [`extract_frame`].
///
/// # Errors
///
/// - [`CaptureError::Probe`] / [`CaptureError::NoVideoStream`] if the
///   rotation cannot be resolved.
/// - [`CaptureError::Decode`] if the frame cannot be reached or decoded.
/// - [`CaptureError::Encode`] / [`CaptureError::OutputExists`] if the image
///   cannot be written.
pub fn try_extract_frame<D>(
    decoder: &D,
    request: &FrameRequest,
    config: &CaptureConfig,
) -> Result<PathBuf, CaptureError>
where
    D: Decoder + ?Sized,
{
    log::trace!(
        "Extracting frame {} of {} to {} ({} decoder)",
        request.frame_index,
        request.video_path.display(),
        request.output_path.display(),
        decoder.name(),
    );

    let rotation = probe_rotation(decoder, &request.video_path)?;
    log::debug!("Video orientation: {rotation}");

    let frame = decoder.decode_frame(&request.video_path, request.frame_index)?;
    let frame = normalize_frame_rotation(frame, rotation);

    if let Some((hint_width, hint_height)) = request.resolution_hint {
        let (width, height) = (frame.width(), frame.height());
        let matches = (width, height) == (hint_width, hint_height)
            || (width, height) == (hint_height, hint_width);
        if !matches {
            log::warn!(
                "Frame is {width}x{height} but the catalogue lists {hint_width}x{hint_height}"
            );
        }
    }

    write_jpeg(&frame, &request.output_path, config.jpeg_quality, config.overwrite)?;
    log::debug!(
        "Frame {} saved to {}",
        request.frame_index,
        request.output_path.display()
    );
    Ok(request.output_path.clone())
}

/// Encode `image` as JPEG and write it to `path`.
///
/// The image is fully encoded in memory first, so an encoding failure leaves
/// no file behind. With `overwrite == false` the file is created exclusively.
///
/// # Errors
///
/// Returns [`CaptureError::OutputExists`] when `overwrite` is off and `path`
/// exists, or [`CaptureError::Encode`] for any encoding or I/O failure.
pub fn write_jpeg(
    image: &DynamicImage,
    path: &Path,
    quality: u8,
    overwrite: bool,
) -> Result<(), CaptureError> {
    let encode_error = |reason: String| CaptureError::Encode {
        path: path.to_path_buf(),
        reason,
    };

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100));
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|error| encode_error(error.to_string()))?;

    let mut file = if overwrite {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    } else {
        OpenOptions::new().write(true).create_new(true).open(path)
    }
    .map_err(|error| match error.kind() {
        ErrorKind::AlreadyExists => CaptureError::OutputExists(path.to_path_buf()),
        _ => encode_error(error.to_string()),
    })?;

    if let Err(error) = file.write_all(&encoded).and_then(|()| file.flush()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(encode_error(error.to_string()));
    }
    Ok(())
}
