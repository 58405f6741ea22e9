//! Display-rotation resolution and raster normalization.
//!
//! Decoders used here hand back the coded raster and ignore the container's
//! rotation metadata. [`resolve_rotation`] works out which way the video was
//! meant to be shown, and [`normalize_frame_rotation`] swaps the raster's
//! edges when they disagree with that rotation.
//!
//! # Example
//!
//! ```
//! use imagecapture::{AspectRatio, VideoStreamMetadata, resolve_rotation};
//!
//! let metadata = VideoStreamMetadata {
//!     codec_type: "video".to_string(),
//!     display_aspect_ratio: AspectRatio::new(9, 16),
//!     ..VideoStreamMetadata::default()
//! };
//! assert_eq!(resolve_rotation(&metadata), 90);
//! ```

use std::{cmp::Ordering, path::Path};

use image::{DynamicImage, imageops::FilterType};

use crate::{
    decoder::Decoder,
    error::CaptureError,
    metadata::{Orientation, VideoStreamMetadata},
};

/// Combine the rotation signals of a video stream into degrees.
///
/// 1. The explicit rotation tag (0 when absent).
/// 2. A non-zero side-data rotation is subtracted from it; the two signals
///    counter-rotate.
/// 3. If the result is exactly 0, the display aspect ratio decides: taller
///    than wide means 90, anything else stays 0.
///
/// The value is not wrapped into `0..360`; negative results are kept as-is.
pub fn resolve_rotation(metadata: &VideoStreamMetadata) -> i32 {
    let mut rotation = metadata.rotation_tag.unwrap_or(0);

    if let Some(side_data_rotation) = metadata.side_data_rotation {
        if side_data_rotation != 0 {
            rotation -= side_data_rotation;
        }
    }

    if rotation == 0 {
        if let Some(ratio) = metadata.display_aspect_ratio {
            rotation = match ratio.width.cmp(&ratio.height) {
                Ordering::Less => 90,
                Ordering::Greater | Ordering::Equal => 0,
            };
        }
    }

    rotation
}

/// Probe `path` through `decoder` and resolve its display rotation.
///
/// # Errors
///
/// Returns [`CaptureError::Probe`] or [`CaptureError::NoVideoStream`] when the
/// probe fails; no rotation is guessed in that case.
pub fn probe_rotation<D>(decoder: &D, path: &Path) -> Result<i32, CaptureError>
where
    D: Decoder + ?Sized,
{
    let metadata = decoder.probe(path)?;
    log::trace!(
        "Rotation signals for {}: tag={:?} side_data={:?} dar={:?}",
        path.display(),
        metadata.rotation_tag,
        metadata.side_data_rotation,
        metadata.display_aspect_ratio,
    );
    Ok(resolve_rotation(&metadata))
}

/// Swap a raster's edges when they disagree with `rotation`.
///
/// - landscape raster with rotation 90 or 270 → resized to `(height, width)`
/// - portrait raster with rotation 0 or 180 → resized to `(height, width)`
/// - everything else passes through untouched
///
/// This is a dimension swap by bilinear resize. Pixel content is never
/// transposed.
pub fn normalize_frame_rotation(image: DynamicImage, rotation: i32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let orientation = Orientation::of(width, height);
    log::debug!("Frame orientation: {orientation}");

    let swap = match orientation {
        Orientation::Landscape => rotation == 90 || rotation == 270,
        Orientation::Portrait => rotation == 0 || rotation == 180,
    };

    if swap {
        log::debug!("Frame resized to {height}x{width}");
        image.resize_exact(height, width, FilterType::Triangle)
    } else {
        image
    }
}
