//! Internal utility functions.
//!
//! Helpers for stream selection, pixel-data copying and timestamp conversion
//! shared by the library-linked probe and decoder.

use ffmpeg_next::{
    Rational, Stream, format::context::Input, frame::Video as VideoFrame, media::Type,
};

/// The first video stream of `input`.
///
/// Probing and decoding both address this stream, so the rotation is always
/// resolved for the stream whose frames are written.
pub fn first_video_stream(input: &Input) -> Option<Stream<'_>> {
    input
        .streams()
        .find(|stream| stream.parameters().medium() == Type::Video)
}

/// Copy pixel data from an FFmpeg video frame into a tightly-packed RGB buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// This function strips that padding so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
pub fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Convert a PTS value in `time_base` units to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Convert a frame number to a seek timestamp in AV_TIME_BASE (microseconds).
///
/// `input_context.seek()` seeks across all streams and expects timestamps in
/// AV_TIME_BASE (1/1_000_000), not in the stream's time base. Frame 0 sits at
/// `start_seconds`, the stream's start time.
pub fn frame_number_to_seek_timestamp(
    frame_number: u64,
    frames_per_second: f64,
    start_seconds: f64,
) -> i64 {
    let seconds = start_seconds + frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0).round() as i64
}

/// Rescale a PTS value to a frame number counted from `start_pts`.
///
/// Rounds to the nearest frame so that timestamps a tick early or late still
/// land on the frame they belong to. Timestamps before the start map to 0.
pub fn pts_to_frame_number(
    pts: i64,
    start_pts: i64,
    time_base: Rational,
    frames_per_second: f64,
) -> u64 {
    let seconds = pts_to_seconds(pts.saturating_sub(start_pts), time_base);
    (seconds * frames_per_second).round().max(0.0) as u64
}

/// Reduce a `width:height` pair by its greatest common divisor.
pub fn reduce_ratio(width: u64, height: u64) -> (u64, u64) {
    let (mut a, mut b) = (width, height);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    if a == 0 {
        (width, height)
    } else {
        (width / a, height / a)
    }
}
