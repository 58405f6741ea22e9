//! Library-linked stream probing.
//!
//! Opens the container through `ffmpeg-next`, selects the first video stream,
//! and reads the three rotation signals the resolver needs: the `rotate`
//! metadata tag, the display-matrix side data, and the display aspect ratio
//! derived from the coded size and sample aspect ratio.

use std::path::Path;

use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_sys_next::AVPacketSideDataType;

use crate::{
    error::CaptureError,
    metadata::{AspectRatio, VideoStreamMetadata},
    utilities::{first_video_stream, reduce_ratio},
};

/// Probe the first video stream of `path`.
///
/// # Errors
///
/// - [`CaptureError::Probe`] if the file cannot be opened or its stream
///   parameters are unreadable.
/// - [`CaptureError::NoVideoStream`] if the container has no video stream.
pub fn probe_video_stream(path: &Path) -> Result<VideoStreamMetadata, CaptureError> {
    let probe_error = |reason: String| CaptureError::Probe {
        path: path.to_path_buf(),
        reason,
    };

    log::debug!("Probing video stream of {}", path.display());

    ffmpeg_next::init()
        .map_err(|error| probe_error(format!("FFmpeg initialisation failed: {error}")))?;
    let input_context =
        ffmpeg_next::format::input(&path).map_err(|error| probe_error(error.to_string()))?;

    let stream = first_video_stream(&input_context)
        .ok_or_else(|| CaptureError::NoVideoStream(path.to_path_buf()))?;

    let rotation_tag = match stream.metadata().get("rotate") {
        Some(value) => Some(value.trim().parse::<i32>().map_err(|error| {
            probe_error(format!("unreadable rotate tag `{value}`: {error}"))
        })?),
        None => None,
    };

    let codec_parameters = stream.parameters();
    let codec_name = {
        let name = codec_parameters.id().name();
        if name.is_empty() { None } else { Some(name.to_string()) }
    };

    let side_data_rotation = display_matrix_side_data(&codec_parameters)
        .and_then(|matrix| display_matrix_rotation(&matrix))
        .map(|degrees| degrees.round() as i32);

    let decoder_context = CodecContext::from_parameters(codec_parameters)
        .map_err(|error| probe_error(format!("unreadable codec parameters: {error}")))?;
    let video_decoder = decoder_context
        .decoder()
        .video()
        .map_err(|error| probe_error(format!("no decoder for video stream: {error}")))?;

    let width = video_decoder.width();
    let height = video_decoder.height();

    let sample_aspect_ratio = video_decoder.aspect_ratio();
    let display_aspect_ratio =
        if sample_aspect_ratio.numerator() > 0 && sample_aspect_ratio.denominator() > 0 {
            let (dar_width, dar_height) = reduce_ratio(
                width as u64 * sample_aspect_ratio.numerator() as u64,
                height as u64 * sample_aspect_ratio.denominator() as u64,
            );
            match (u32::try_from(dar_width), u32::try_from(dar_height)) {
                (Ok(dar_width), Ok(dar_height)) => AspectRatio::new(dar_width, dar_height),
                _ => None,
            }
        } else {
            None
        };

    Ok(VideoStreamMetadata {
        codec_type: "video".to_string(),
        codec_name,
        width,
        height,
        rotation_tag,
        side_data_rotation,
        display_aspect_ratio,
    })
}

/// Read the 3×3 display matrix attached to a stream's codec parameters.
fn display_matrix_side_data(parameters: &ffmpeg_next::codec::Parameters) -> Option<[i32; 9]> {
    // SAFETY: the parameters are owned by a stream of a live input context;
    // `coded_side_data` holds `nb_coded_side_data` initialised entries.
    let raw_parameters = unsafe { *parameters.as_ptr() };
    if raw_parameters.coded_side_data.is_null() || raw_parameters.nb_coded_side_data <= 0 {
        return None;
    }
    let entries = unsafe {
        std::slice::from_raw_parts(
            raw_parameters.coded_side_data,
            raw_parameters.nb_coded_side_data as usize,
        )
    };

    let entry = entries
        .iter()
        .find(|entry| entry.type_ == AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX)?;
    if entry.data.is_null() || entry.size < 9 * size_of::<i32>() {
        return None;
    }

    let bytes = unsafe { std::slice::from_raw_parts(entry.data, entry.size) };
    let mut matrix = [0_i32; 9];
    for (value, chunk) in matrix.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Some(matrix)
}

/// Rotation angle, in degrees, encoded by a 16.16 fixed-point display matrix.
///
/// Matches what `ffprobe` prints as a side-data `rotation`: an iPhone portrait
/// recording carries `-90`. Returns `None` for a degenerate matrix.
pub fn display_matrix_rotation(matrix: &[i32; 9]) -> Option<f64> {
    let fixed = |value: i32| value as f64 / 65536.0;
    let scale_x = fixed(matrix[0]).hypot(fixed(matrix[3]));
    let scale_y = fixed(matrix[1]).hypot(fixed(matrix[4]));
    if scale_x == 0.0 || scale_y == 0.0 {
        return None;
    }
    let rotation = (fixed(matrix[1]) / scale_y)
        .atan2(fixed(matrix[0]) / scale_x)
        .to_degrees();
    Some(-rotation)
}
