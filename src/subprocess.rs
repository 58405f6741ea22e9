//! Subprocess-shelled probing and decoding.
//!
//! [`CommandDecoder`] runs the `ffprobe` and `ffmpeg` executables instead of
//! linking the libraries. Probing parses `ffprobe -show_streams -of json`;
//! decoding asks `ffmpeg` to select one frame by its decode index and pipe it
//! back as PNG. Auto-rotation is disabled so the raster matches what the
//! library-linked decoder produces.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use image::{DynamicImage, ImageFormat};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    decoder::Decoder,
    error::CaptureError,
    metadata::{AspectRatio, VideoStreamMetadata},
};

/// A [`Decoder`] backed by the `ffprobe` and `ffmpeg` executables.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new("ffprobe", "ffmpeg")
    }
}

impl CommandDecoder {
    /// Use the given executables (bare names are resolved through `PATH`).
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl Decoder for CommandDecoder {
    fn probe(&self, path: &Path) -> Result<VideoStreamMetadata, CaptureError> {
        log::debug!("Probing {} with {}", path.display(), self.ffprobe.display());
        let output = run(
            Command::new(&self.ffprobe)
                .args(["-v", "error", "-show_streams", "-of", "json"])
                .arg(path),
            &self.ffprobe,
        )?;

        if !output.status.success() {
            return Err(CaptureError::Probe {
                path: path.to_path_buf(),
                reason: stderr_reason(&output),
            });
        }

        parse_ffprobe_json(&output.stdout, path)
    }

    fn decode_frame(&self, path: &Path, frame_index: u64) -> Result<DynamicImage, CaptureError> {
        let decode_error = |reason: String| CaptureError::Decode {
            path: path.to_path_buf(),
            frame_index,
            reason,
        };

        let select = format!("select=eq(n\\,{frame_index})");
        let output = run(
            Command::new(&self.ffmpeg)
                .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
                .arg(path)
                .args(["-map", "0:v:0", "-vf", &select])
                .args(["-fps_mode", "passthrough", "-frames:v", "1"])
                .args(["-f", "image2pipe", "-c:v", "png", "-"]),
            &self.ffmpeg,
        )?;

        if !output.status.success() {
            return Err(decode_error(stderr_reason(&output)));
        }
        if output.stdout.is_empty() {
            return Err(decode_error(
                "end of stream reached before the requested frame".to_string(),
            ));
        }

        image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
            .map_err(|error| decode_error(error.to_string()))
    }

    fn name(&self) -> &'static str {
        "subprocess"
    }
}

/// Spawn `command` and wait for it, mapping a missing executable to
/// [`CaptureError::DependencyMissing`].
fn run(command: &mut Command, program: &Path) -> Result<Output, CaptureError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|error| match error.kind() {
            ErrorKind::NotFound => CaptureError::DependencyMissing(program.display().to_string()),
            _ => CaptureError::Io(error),
        })
}

fn stderr_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    display_aspect_ratio: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<HashMap<String, Value>>,
}

/// Parse `ffprobe -show_streams -of json` output into the first video
/// stream's metadata.
///
/// Only the first side-data entry is consulted for a `rotation` field. A
/// display aspect ratio of `N/A` or with a zero term is treated as absent.
///
/// # Errors
///
/// - [`CaptureError::Probe`] if the document is not valid JSON or a rotation
///   value is not an integer.
/// - [`CaptureError::NoVideoStream`] if no stream has `codec_type == "video"`.
pub fn parse_ffprobe_json(
    document: &[u8],
    path: &Path,
) -> Result<VideoStreamMetadata, CaptureError> {
    let probe_error = |reason: String| CaptureError::Probe {
        path: path.to_path_buf(),
        reason,
    };

    let document: ProbeDocument = serde_json::from_slice(document)
        .map_err(|error| probe_error(format!("unreadable ffprobe output: {error}")))?;

    let stream = document
        .streams
        .into_iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CaptureError::NoVideoStream(path.to_path_buf()))?;

    let rotation_tag = match stream.tags.get("rotate") {
        Some(value) => Some(value.trim().parse::<i32>().map_err(|error| {
            probe_error(format!("unreadable rotate tag `{value}`: {error}"))
        })?),
        None => None,
    };

    let side_data_rotation = match stream
        .side_data_list
        .first()
        .and_then(|side_data| side_data.get("rotation"))
    {
        Some(value) => Some(json_integer(value).ok_or_else(|| {
            probe_error(format!("unreadable side data rotation `{value}`"))
        })?),
        None => None,
    };

    let display_aspect_ratio = stream
        .display_aspect_ratio
        .as_deref()
        .and_then(|ratio| ratio.parse::<AspectRatio>().ok());

    Ok(VideoStreamMetadata {
        codec_type: "video".to_string(),
        codec_name: stream.codec_name,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        rotation_tag,
        side_data_rotation,
        display_aspect_ratio,
    })
}

fn json_integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64))
            .and_then(|integer| i32::try_from(integer).ok()),
        Value::String(text) => text.trim().parse::<i32>().ok(),
        _ => None,
    }
}
