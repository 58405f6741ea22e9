//! Library-linked single-frame decoding.
//!
//! [`decode_frame`] opens the container, seeks to the keyframe at or before
//! the requested frame, and decodes forward until that frame is reached.
//! Frames are numbered from the stream's start time, so containers whose
//! first timestamp is not zero (MPEG-TS, edit-list-free MP4) number their
//! first frame 0, as `ffmpeg -vf select` does. The raster is returned in its
//! coded orientation: rotation metadata is not applied here.

use std::path::Path;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ffmpeg_sys_next::AV_NOPTS_VALUE;
use image::{DynamicImage, RgbImage};

use crate::{
    error::CaptureError,
    utilities::{
        first_video_stream, frame_number_to_seek_timestamp, frame_to_rgb_buffer,
        pts_to_frame_number, pts_to_seconds,
    },
};

/// Decode frame `frame_index` (zero-based) of the first video stream in `path`.
///
/// When the stream declares a frame rate, seeks to the nearest keyframe before
/// the target and maps each decoded timestamp, relative to the stream start,
/// back to a frame number. If the seek lands past the target, decoding starts
/// over from the beginning of the stream. Without a usable frame rate, frames
/// are counted from the start of the stream.
///
/// # Errors
///
/// Returns [`CaptureError::Decode`] if the file cannot be opened, has no
/// video stream, ends before the requested frame, or yields an untimed frame
/// after a seek.
pub fn decode_frame(path: &Path, frame_index: u64) -> Result<DynamicImage, CaptureError> {
    let decode_error = |reason: String| CaptureError::Decode {
        path: path.to_path_buf(),
        frame_index,
        reason,
    };

    ffmpeg_next::init()
        .map_err(|error| decode_error(format!("FFmpeg initialisation failed: {error}")))?;
    let mut input_context =
        ffmpeg_next::format::input(&path).map_err(|error| decode_error(error.to_string()))?;

    let stream = first_video_stream(&input_context)
        .ok_or_else(|| decode_error("no video stream".to_string()))?;
    let video_stream_index = stream.index();
    let time_base = stream.time_base();
    let start_pts = match stream.start_time() {
        AV_NOPTS_VALUE => 0,
        start => start,
    };
    let frames_per_second = frames_per_second(stream.avg_frame_rate())
        .or_else(|| frames_per_second(stream.rate()));

    let decoder_context = CodecContext::from_parameters(stream.parameters())
        .map_err(|error| decode_error(error.to_string()))?;
    let mut decoder = decoder_context
        .decoder()
        .video()
        .map_err(|error| decode_error(error.to_string()))?;

    let width = decoder.width();
    let height = decoder.height();
    let mut scaler = ScalingContext::get(
        decoder.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )
    .map_err(|error| decode_error(error.to_string()))?;

    let clock = frames_per_second.map(|frames_per_second| FrameClock {
        time_base,
        frames_per_second,
        start_pts,
    });

    log::trace!(
        "Decoding frame {} of {} (stream={}, fps={:?}, start_pts={})",
        frame_index,
        path.display(),
        video_stream_index,
        frames_per_second,
        start_pts,
    );

    let mut decoded_frame = VideoFrame::empty();
    let mut position = None;

    if let Some(clock) = clock.filter(|_| frame_index > 0) {
        let target_timestamp = clock.seek_timestamp(frame_index);
        input_context
            .seek(target_timestamp, ..target_timestamp)
            .map_err(|error| decode_error(format!("seek failed: {error}")))?;

        let mut locator = FrameLocator::new(frame_index, Some(clock), true);
        match scan(
            &mut input_context,
            &mut decoder,
            video_stream_index,
            &mut locator,
            &mut decoded_frame,
        )
        .map_err(decode_error)?
        {
            Position::Past => {
                log::debug!(
                    "Seek landed past frame {frame_index} of {}; decoding from the start",
                    path.display()
                );
                let start_timestamp = clock.seek_timestamp(0);
                input_context
                    .seek(start_timestamp, ..start_timestamp)
                    .map_err(|error| decode_error(format!("seek failed: {error}")))?;
                decoder.flush();
            }
            reached => position = Some(reached),
        }
    }

    let position = match position {
        Some(position) => position,
        None => {
            let mut locator = FrameLocator::new(frame_index, clock, false);
            scan(
                &mut input_context,
                &mut decoder,
                video_stream_index,
                &mut locator,
                &mut decoded_frame,
            )
            .map_err(decode_error)?
        }
    };

    if position != Position::At {
        return Err(decode_error(
            "end of stream reached before the requested frame".to_string(),
        ));
    }

    let mut rgb_frame = VideoFrame::empty();
    scaler
        .run(&decoded_frame, &mut rgb_frame)
        .map_err(|error| decode_error(error.to_string()))?;
    convert_frame_to_image(&rgb_frame, width, height).map_err(decode_error)
}

/// Where the last decoded frame sits relative to the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Not there yet. Returned by [`scan`] when the stream ran out.
    Before,
    /// The requested frame, or the first frame after it when the stream has
    /// no frame with exactly that number.
    At,
    /// The first frame after a seek is already past the requested one.
    Past,
}

/// Decode packets of `stream_index` until `locator` leaves
/// [`Position::Before`], flushing the decoder at end of stream. On
/// [`Position::At`] the frame is left in `frame`.
fn scan(
    input_context: &mut Input,
    decoder: &mut VideoDecoder,
    stream_index: usize,
    locator: &mut FrameLocator,
    frame: &mut VideoFrame,
) -> Result<Position, String> {
    for (stream, packet) in input_context.packets() {
        if stream.index() != stream_index {
            continue;
        }

        decoder
            .send_packet(&packet)
            .map_err(|error| error.to_string())?;

        while decoder.receive_frame(frame).is_ok() {
            match locator.locate(frame_timestamp(frame))? {
                Position::Before => {}
                position => return Ok(position),
            }
        }
    }

    // Flush the decoder.
    decoder.send_eof().map_err(|error| error.to_string())?;
    while decoder.receive_frame(frame).is_ok() {
        match locator.locate(frame_timestamp(frame))? {
            Position::Before => {}
            position => return Ok(position),
        }
    }

    Ok(Position::Before)
}

fn frame_timestamp(frame: &VideoFrame) -> Option<i64> {
    frame.timestamp().or(frame.pts())
}

/// Maps stream timestamps to frame numbers counted from the stream start.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    time_base: Rational,
    frames_per_second: f64,
    start_pts: i64,
}

impl FrameClock {
    fn frame_number(&self, pts: i64) -> u64 {
        pts_to_frame_number(pts, self.start_pts, self.time_base, self.frames_per_second)
    }

    fn seek_timestamp(&self, frame_number: u64) -> i64 {
        let start_seconds = pts_to_seconds(self.start_pts, self.time_base);
        frame_number_to_seek_timestamp(frame_number, self.frames_per_second, start_seconds)
    }
}

/// Tracks decoded frames against the requested index.
struct FrameLocator {
    target: u64,
    clock: Option<FrameClock>,
    /// Number of the next frame when it carries no timestamp. Unknown after
    /// a seek until a timestamped frame has been seen.
    next: Option<u64>,
    awaiting_first_after_seek: bool,
}

impl FrameLocator {
    fn new(target: u64, clock: Option<FrameClock>, seeked: bool) -> Self {
        Self {
            target,
            clock,
            next: if seeked { None } else { Some(0) },
            awaiting_first_after_seek: seeked,
        }
    }

    fn locate(&mut self, pts: Option<i64>) -> Result<Position, String> {
        let current = match (self.clock, pts) {
            (Some(clock), Some(pts)) => clock.frame_number(pts),
            _ => self.next.ok_or_else(|| {
                "decoded frame has no timestamp to number it after seeking".to_string()
            })?,
        };
        let first_after_seek = std::mem::take(&mut self.awaiting_first_after_seek);
        self.next = Some(current.saturating_add(1));

        Ok(if current < self.target {
            Position::Before
        } else if current > self.target && first_after_seek {
            Position::Past
        } else {
            Position::At
        })
    }
}

fn frames_per_second(rate: Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    } else {
        None
    }
}

/// Convert a scaled RGB24 video frame to an [`image::DynamicImage`].
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, String> {
    let buffer = frame_to_rgb_buffer(rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| "failed to construct RGB image from decoded frame data".to_string())?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
