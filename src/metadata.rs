//! Video stream metadata types.
//!
//! [`VideoStreamMetadata`] is what a [`Decoder`](crate::Decoder) probe returns
//! for the first video stream of a container. It is read once per extraction,
//! fed to the rotation resolver, and discarded.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Metadata for the first video stream of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct VideoStreamMetadata {
    /// Stream type as reported by the prober (always `"video"` once selected).
    pub codec_type: String,
    /// Codec name (e.g. `"h264"`, `"hevc"`), if known.
    pub codec_name: Option<String>,
    /// Coded frame width in pixels.
    pub width: u32,
    /// Coded frame height in pixels.
    pub height: u32,
    /// Explicit container rotation tag (`rotate`), in degrees.
    pub rotation_tag: Option<i32>,
    /// Rotation carried in the stream's display-matrix side data, in degrees.
    pub side_data_rotation: Option<i32>,
    /// Display aspect ratio, when the container declares one.
    pub display_aspect_ratio: Option<AspectRatio>,
}

/// A `width:height` display aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    /// Horizontal term.
    pub width: u32,
    /// Vertical term.
    pub height: u32,
}

impl AspectRatio {
    /// Create a ratio. Returns `None` when either term is zero, which probers
    /// use to mean "unknown".
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (width, height) = value
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("aspect ratio `{value}` is not of the form W:H"))?;
        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|error| format!("aspect ratio `{value}`: {error}"))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|error| format!("aspect ratio `{value}`: {error}"))?;
        AspectRatio::new(width, height).ok_or_else(|| format!("aspect ratio `{value}` is unknown"))
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Orientation of a decoded raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Taller than wide.
    Portrait,
    /// Wider than tall, or square.
    Landscape,
}

impl Orientation {
    /// Classify a raster: portrait if `height > width`, landscape otherwise.
    pub fn of(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Orientation::Portrait => f.write_str("portrait"),
            Orientation::Landscape => f.write_str("landscape"),
        }
    }
}
