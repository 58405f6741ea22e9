//! The host application's catalog, as a capability.
//!
//! The capture pipeline needs only a few things from the media library it
//! runs inside: look a scene up, list images by path, rescan a folder, and
//! update an image. [`Host`] names those operations; [`StashClient`](crate::StashClient)
//! is the production implementation.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::CaptureError;

/// A scene (catalogued video) as returned by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneRecord {
    /// Host identifier.
    pub id: String,
    /// Title, if one was set.
    pub title: Option<String>,
    /// Release date (`YYYY-MM-DD`), if one was set.
    pub date: Option<String>,
    /// Video files; the first one is the primary file.
    pub files: Vec<VideoFileRecord>,
    /// Galleries linked to the scene.
    pub gallery_ids: Vec<String>,
    /// Tags applied to the scene.
    pub tag_ids: Vec<String>,
}

impl SceneRecord {
    /// The scene's primary video file.
    pub fn primary_file(&self) -> Option<&VideoFileRecord> {
        self.files.first()
    }
}

/// A video file attached to a scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoFileRecord {
    /// Absolute path on the host.
    pub path: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Catalogued width in pixels.
    pub width: u32,
    /// Catalogued height in pixels.
    pub height: u32,
    /// Frames per second.
    pub frame_rate: f64,
}

/// An image as returned by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    /// Host identifier.
    pub id: String,
    /// Paths of every visual file backing the image.
    pub paths: Vec<String>,
}

/// Associations to apply to an image. Empty fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUpdate {
    /// Image to update.
    pub id: String,
    /// Galleries to link.
    pub gallery_ids: Vec<String>,
    /// Tags to apply.
    pub tag_ids: Vec<String>,
    /// Date to set.
    pub date: Option<String>,
}

impl ImageUpdate {
    /// Whether the update carries anything besides the id.
    pub fn is_empty(&self) -> bool {
        self.gallery_ids.is_empty() && self.tag_ids.is_empty() && self.date.is_none()
    }
}

/// State of a host background job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued.
    Ready,
    /// In progress.
    Running,
    /// Completed successfully.
    Finished,
    /// Being stopped.
    Stopping,
    /// Cancelled before completion.
    Cancelled,
    /// Failed.
    Failed,
    /// A status this crate does not know.
    Other(String),
}

impl JobStatus {
    /// Whether the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

impl FromStr for JobStatus {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "READY" => JobStatus::Ready,
            "RUNNING" => JobStatus::Running,
            "FINISHED" => JobStatus::Finished,
            "STOPPING" => JobStatus::Stopping,
            "CANCELLED" => JobStatus::Cancelled,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        })
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Ready => f.write_str("READY"),
            JobStatus::Running => f.write_str("RUNNING"),
            JobStatus::Finished => f.write_str("FINISHED"),
            JobStatus::Stopping => f.write_str("STOPPING"),
            JobStatus::Cancelled => f.write_str("CANCELLED"),
            JobStatus::Failed => f.write_str("FAILED"),
            JobStatus::Other(other) => f.write_str(other),
        }
    }
}

/// Catalog operations the capture pipeline consumes.
pub trait Host {
    /// Look a scene up by id. `Ok(None)` when it does not exist.
    fn find_scene(&self, scene_id: &str) -> Result<Option<SceneRecord>, CaptureError>;

    /// Every image with a file path matching the regular expression.
    ///
    /// The result must be complete: output naming relies on it.
    fn find_images_by_path_regex(&self, pattern: &str) -> Result<Vec<ImageRecord>, CaptureError>;

    /// The image whose file path is exactly `path`, if catalogued.
    fn find_image_by_path(&self, path: &str) -> Result<Option<ImageRecord>, CaptureError>;

    /// Apply associations to an image; returns the updated id.
    fn update_image(&self, update: &ImageUpdate) -> Result<Option<String>, CaptureError>;

    /// Ask the host to re-index `paths`; returns the scan job id.
    fn metadata_scan(&self, paths: &[String]) -> Result<String, CaptureError>;

    /// Current status of a job. `Ok(None)` once the host forgot it.
    fn find_job(&self, job_id: &str) -> Result<Option<JobStatus>, CaptureError>;
}
