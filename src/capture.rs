//! The end-to-end capture pipeline.
//!
//! [`capture_frame`] resolves a scene on the host, picks the next free
//! capture path next to its video, extracts the frame, and then asks the host
//! to pick the new image up (rescan, and optionally registration).
//!
//! Only the steps up to the written image decide success. A failed rescan or
//! registration is logged and the capture still reports its output path.

use std::{
    path::{Path, PathBuf},
    thread,
};

use serde_json::json;

use crate::{
    config::CaptureConfig,
    decoder::Decoder,
    error::CaptureError,
    extract::{FrameRequest, try_extract_frame},
    host::{Host, ImageUpdate, JobStatus, SceneRecord},
    naming::{generate_output_path, output_prefix, prefix_pattern},
    progress::{CaptureStage, ProgressTracker},
};

/// What a successful capture produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Scene the frame was taken from.
    pub scene_id: String,
    /// Path of the written image.
    pub output_path: PathBuf,
    /// Id of the rescan job, if one was started.
    pub scan_job_id: Option<String>,
    /// Host id of the new image, if it was registered.
    pub image_id: Option<String>,
}

/// Capture one frame of a scene, logging the outcome.
///
/// Emits the `captureFrame = {"result": ...}` line the host UI waits for,
/// with the written path or `null`.
pub fn capture_frame<H, D>(
    host: &H,
    decoder: &D,
    config: &CaptureConfig,
    scene_id: &str,
    frame_index: u64,
) -> Option<CaptureOutcome>
where
    H: Host + ?Sized,
    D: Decoder + ?Sized,
{
    let outcome = match try_capture_frame(host, decoder, config, scene_id, frame_index) {
        Ok(outcome) => Some(outcome),
        Err(error) => {
            log::error!("Failed to capture frame {frame_index} of scene {scene_id}");
            log::error!("{error}");
            None
        }
    };

    let result = outcome
        .as_ref()
        .map(|outcome| outcome.output_path.to_string_lossy().into_owned());
    log::info!("captureFrame = {}", json!({ "result": result }));
    outcome
}

/// Fallible form of [`capture_frame`].
///
/// # Errors
///
/// - [`CaptureError::Lookup`] if the scene does not exist or has no file.
/// - [`CaptureError::Host`] if the image search fails.
/// - [`CaptureError::NamingExhausted`] if no capture number is left.
/// - Any error of [`try_extract_frame`].
pub fn try_capture_frame<H, D>(
    host: &H,
    decoder: &D,
    config: &CaptureConfig,
    scene_id: &str,
    frame_index: u64,
) -> Result<CaptureOutcome, CaptureError>
where
    H: Host + ?Sized,
    D: Decoder + ?Sized,
{
    let stages = 3 + u32::from(config.rescan()) + u32::from(config.register());
    let mut progress = ProgressTracker::new(config.progress.clone(), stages);

    let scene = host
        .find_scene(scene_id)?
        .ok_or_else(|| CaptureError::Lookup(format!("scene {scene_id} not found")))?;
    let file = scene
        .primary_file()
        .ok_or_else(|| CaptureError::Lookup(format!("scene {scene_id} has no video file")))?;
    log::debug!(
        "Scene {}{} -> {}",
        scene.id,
        scene
            .title
            .as_deref()
            .map(|title| format!(" ({title})"))
            .unwrap_or_default(),
        file.path
    );
    progress.advance(CaptureStage::SceneLookup);

    let output_path = next_capture_path(host, &file.path)?;
    log::debug!("Capture will be written to {output_path}");
    progress.advance(CaptureStage::OutputNaming);

    let mut request = FrameRequest::new(&file.path, frame_index, &output_path);
    if file.width > 0 && file.height > 0 {
        request = request.with_resolution_hint(file.width, file.height);
    }
    let output_path = try_extract_frame(decoder, &request, config)?;
    log::info!("Saved frame {frame_index} to {}", output_path.display());
    progress.advance(CaptureStage::FrameExtraction);

    let mut outcome = CaptureOutcome {
        scene_id: scene.id.clone(),
        output_path,
        scan_job_id: None,
        image_id: None,
    };

    if config.rescan() {
        match rescan_folder(host, &file.path) {
            Ok(job_id) => outcome.scan_job_id = Some(job_id),
            Err(error) => log::warn!("Library rescan failed: {error}"),
        }
        progress.advance(CaptureStage::LibraryRescan);
    }

    if config.register() {
        match &outcome.scan_job_id {
            Some(job_id) => match register_image(host, config, &scene, job_id, &outcome.output_path) {
                Ok(image_id) => outcome.image_id = image_id,
                Err(error) => log::warn!("Image registration failed: {error}"),
            },
            None => log::warn!("Image registration skipped: no rescan job to wait for"),
        }
        progress.advance(CaptureStage::ImageRegistration);
    }

    Ok(outcome)
}

/// Ask the host which captures of `video_path` exist, and name the next one.
fn next_capture_path<H: Host + ?Sized>(host: &H, video_path: &str) -> Result<String, CaptureError> {
    let pattern = prefix_pattern(&output_prefix(video_path));
    let existing: Vec<String> = host
        .find_images_by_path_regex(&pattern)?
        .into_iter()
        .flat_map(|image| image.paths)
        .collect();
    log::trace!("{} existing image(s) match {pattern}", existing.len());
    generate_output_path(&existing, video_path)
}

fn rescan_folder<H: Host + ?Sized>(host: &H, video_path: &str) -> Result<String, CaptureError> {
    let folder = Path::new(video_path)
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .filter(|parent| !parent.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let job_id = host.metadata_scan(&[folder.clone()])?;
    log::debug!("Rescan of {folder} queued as job {job_id}");
    Ok(job_id)
}

/// Poll `job_id` until it finishes.
///
/// Attempt `n` waits `n × base delay` before asking. A job the host no longer
/// knows about is treated as finished.
///
/// # Errors
///
/// Returns [`CaptureError::Host`] if the job fails, is cancelled, or is still
/// running after the configured number of attempts.
pub fn wait_for_job<H: Host + ?Sized>(
    host: &H,
    config: &CaptureConfig,
    job_id: &str,
) -> Result<(), CaptureError> {
    for attempt in 1..=config.job_poll_attempts {
        thread::sleep(config.job_poll_delay * attempt);
        match host.find_job(job_id)? {
            None | Some(JobStatus::Finished) => return Ok(()),
            Some(status @ (JobStatus::Failed | JobStatus::Cancelled)) => {
                return Err(CaptureError::Host(format!("scan job {job_id} ended as {status}")));
            }
            Some(status) => log::trace!("Scan job {job_id} is {status} (attempt {attempt})"),
        }
    }
    Err(CaptureError::Host(format!(
        "scan job {job_id} did not finish after {} polls",
        config.job_poll_attempts
    )))
}

/// Associations a capture of `scene` inherits: its first gallery, all of its
/// tags, and its date.
pub fn scene_associations(scene: &SceneRecord, image_id: &str) -> ImageUpdate {
    ImageUpdate {
        id: image_id.to_string(),
        gallery_ids: scene.gallery_ids.iter().take(1).cloned().collect(),
        tag_ids: scene.tag_ids.clone(),
        date: scene.date.clone(),
    }
}

fn register_image<H: Host + ?Sized>(
    host: &H,
    config: &CaptureConfig,
    scene: &SceneRecord,
    job_id: &str,
    output_path: &Path,
) -> Result<Option<String>, CaptureError> {
    wait_for_job(host, config, job_id)?;

    let path = output_path.to_string_lossy();
    let image = host
        .find_image_by_path(&path)?
        .ok_or_else(|| CaptureError::Host(format!("{path} was not catalogued by the rescan")))?;

    let update = scene_associations(scene, &image.id);
    if update.is_empty() {
        log::debug!("Image {} has nothing to inherit from scene {}", image.id, scene.id);
        return Ok(Some(image.id));
    }
    let updated = host.update_image(&update)?;
    log::info!("Image {} linked to scene {}", image.id, scene.id);
    Ok(updated.or(Some(image.id)))
}
