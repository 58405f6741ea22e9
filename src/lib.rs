//! # imagecapture
//!
//! Capture a still frame from a catalogued video and add it to the library
//! as an image.
//!
//! `imagecapture` is the engine of a media-server plugin. Given a scene id and
//! a frame index it looks the scene's video up on the host, decodes exactly
//! that frame with FFmpeg (linked through
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), or the `ffmpeg`
//! executables), corrects its orientation, writes it next to the video under
//! a collision-free name, and asks the host to catalogue it.
//!
//! ## Quick Start
//!
//! ### Extract a Frame
//!
//! ```no_run
//! use imagecapture::{CaptureConfig, FfmpegDecoder, FrameRequest, extract_frame};
//!
//! let request = FrameRequest::new("/videos/clip.mp4", 240, "/videos/clip_000.jpg");
//! let result = extract_frame(&FfmpegDecoder, &request, &CaptureConfig::new());
//! assert!(result.success);
//! ```
//!
//! ### Resolve a Video's Rotation
//!
//! ```no_run
//! use std::path::Path;
//!
//! use imagecapture::{Decoder, FfmpegDecoder, resolve_rotation};
//!
//! let metadata = FfmpegDecoder.probe(Path::new("/videos/phone.mov")).unwrap();
//! println!("{} degrees", resolve_rotation(&metadata));
//! ```
//!
//! ### Capture from a Host Scene
//!
//! ```no_run
//! use imagecapture::{CaptureConfig, FfmpegDecoder, ServerConnection, StashClient, capture_frame};
//!
//! let connection: ServerConnection =
//!     serde_json::from_str(r#"{"Scheme": "http", "Host": "localhost", "Port": 9999}"#).unwrap();
//! let host = StashClient::new(&connection).unwrap();
//! let config = CaptureConfig::new().with_register(true);
//!
//! if let Some(outcome) = capture_frame(&host, &FfmpegDecoder, &config, "42", 120) {
//!     println!("saved {}", outcome.output_path.display());
//! }
//! ```
//!
//! ## Features
//!
//! - **Rotation-aware extraction**: container rotate tags, display-matrix
//!   side data, and a portrait guess from the display aspect ratio
//! - **Two decoder backends**: the linked FFmpeg libraries, or `ffprobe` /
//!   `ffmpeg` subprocesses
//! - **Collision-free naming**: `clip_000.jpg`, `clip_001.jpg`, … never
//!   reusing a number
//! - **Host follow-up**: folder rescan, then optional tagging and gallery
//!   linking of the new image
//! - **Plugin protocol**: stdin/stdout task envelope and the host's stderr
//!   log format
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build the crate; the
//! subprocess backend additionally needs `ffprobe` and `ffmpeg` on `PATH`.

pub mod capture;
pub mod config;
pub mod decoder;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod host;
pub mod logging;
pub mod metadata;
pub mod naming;
pub mod plugin;
pub mod probe;
pub mod progress;
pub mod rotation;
pub mod stash;
pub mod subprocess;
mod utilities;
pub mod video;

pub use capture::{CaptureOutcome, capture_frame, try_capture_frame};
pub use config::CaptureConfig;
pub use decoder::{Decoder, DecoderBackend, FfmpegDecoder};
pub use error::CaptureError;
pub use extract::{ExtractionResult, FrameRequest, extract_frame, try_extract_frame};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use host::{Host, ImageRecord, ImageUpdate, JobStatus, SceneRecord, VideoFileRecord};
pub use logging::{PluginLogger, StashProgress};
pub use metadata::{AspectRatio, Orientation, VideoStreamMetadata};
pub use naming::generate_output_path;
pub use plugin::{PluginArgs, PluginInput, PluginOutput};
pub use progress::{CaptureStage, ProgressCallback, ProgressInfo};
pub use rotation::{normalize_frame_rotation, probe_rotation, resolve_rotation};
pub use stash::{ServerConnection, StashClient};
pub use subprocess::CommandDecoder;
