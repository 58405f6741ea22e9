//! Shared fakes for the integration tests: an in-memory host catalog and a
//! scripted decoder.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    path::Path,
};

use image::{DynamicImage, Rgb, RgbImage};
use imagecapture::{
    CaptureError, Decoder, Host, ImageRecord, ImageUpdate, JobStatus, SceneRecord,
    VideoFileRecord, VideoStreamMetadata,
};
use regex::Regex;

pub fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

/// A scene with one video file.
pub fn scene(id: &str, video_path: &Path, width: u32, height: u32) -> SceneRecord {
    SceneRecord {
        id: id.to_string(),
        title: Some(format!("Scene {id}")),
        date: None,
        files: vec![VideoFileRecord {
            path: video_path.to_string_lossy().into_owned(),
            duration: 10.0,
            width,
            height,
            frame_rate: 30.0,
        }],
        gallery_ids: Vec::new(),
        tag_ids: Vec::new(),
    }
}

/// A host catalog held in memory.
///
/// A rescan catalogues every `.jpg` in the scanned folders that is not known
/// yet. Job polls pop `job_statuses`; once empty the job reads as finished.
#[derive(Default)]
pub struct InMemoryHost {
    pub scenes: HashMap<String, SceneRecord>,
    pub images: RefCell<Vec<ImageRecord>>,
    pub scans: RefCell<Vec<Vec<String>>>,
    pub updates: RefCell<Vec<ImageUpdate>>,
    pub job_statuses: RefCell<VecDeque<JobStatus>>,
    pub job_polls: Cell<u32>,
    pub fail_scan: bool,
}

impl InMemoryHost {
    pub fn with_scene(mut self, scene: SceneRecord) -> Self {
        self.scenes.insert(scene.id.clone(), scene);
        self
    }

    pub fn with_image(self, id: &str, path: &str) -> Self {
        self.images.borrow_mut().push(ImageRecord {
            id: id.to_string(),
            paths: vec![path.to_string()],
        });
        self
    }

    pub fn with_job_statuses(self, statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        self.job_statuses.borrow_mut().extend(statuses);
        self
    }

    pub fn image_paths(&self) -> Vec<String> {
        self.images
            .borrow()
            .iter()
            .flat_map(|image| image.paths.clone())
            .collect()
    }
}

impl Host for InMemoryHost {
    fn find_scene(&self, scene_id: &str) -> Result<Option<SceneRecord>, CaptureError> {
        Ok(self.scenes.get(scene_id).cloned())
    }

    fn find_images_by_path_regex(&self, pattern: &str) -> Result<Vec<ImageRecord>, CaptureError> {
        let regex = Regex::new(pattern).map_err(|error| CaptureError::Host(error.to_string()))?;
        Ok(self
            .images
            .borrow()
            .iter()
            .filter(|image| image.paths.iter().any(|path| regex.is_match(path)))
            .cloned()
            .collect())
    }

    fn find_image_by_path(&self, path: &str) -> Result<Option<ImageRecord>, CaptureError> {
        Ok(self
            .images
            .borrow()
            .iter()
            .find(|image| image.paths.iter().any(|candidate| candidate == path))
            .cloned())
    }

    fn update_image(&self, update: &ImageUpdate) -> Result<Option<String>, CaptureError> {
        self.updates.borrow_mut().push(update.clone());
        Ok(Some(update.id.clone()))
    }

    fn metadata_scan(&self, paths: &[String]) -> Result<String, CaptureError> {
        if self.fail_scan {
            return Err(CaptureError::Host("scan refused".to_string()));
        }
        self.scans.borrow_mut().push(paths.to_vec());

        let known = self.image_paths();
        let mut discovered = Vec::new();
        for folder in paths {
            for entry in std::fs::read_dir(folder)? {
                let path = entry?.path();
                let path = path.to_string_lossy().into_owned();
                if path.ends_with(".jpg") && !known.contains(&path) {
                    discovered.push(path);
                }
            }
        }

        let mut images = self.images.borrow_mut();
        for path in discovered {
            let id = (images.len() + 1).to_string();
            images.push(ImageRecord {
                id,
                paths: vec![path],
            });
        }
        Ok(format!("job-{}", self.scans.borrow().len()))
    }

    fn find_job(&self, _job_id: &str) -> Result<Option<JobStatus>, CaptureError> {
        self.job_polls.set(self.job_polls.get() + 1);
        Ok(Some(
            self.job_statuses
                .borrow_mut()
                .pop_front()
                .unwrap_or(JobStatus::Finished),
        ))
    }
}

/// A decoder returning canned metadata and solid-colour frames.
pub struct FakeDecoder {
    pub metadata: VideoStreamMetadata,
    pub frame_size: (u32, u32),
    pub frame_count: u64,
    pub probe_fails: bool,
    pub probes: Cell<u32>,
    pub decodes: Cell<u32>,
}

impl FakeDecoder {
    /// A video whose raster is `width × height` with no rotation signals.
    pub fn new(width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            metadata: VideoStreamMetadata {
                codec_type: "video".to_string(),
                codec_name: Some("h264".to_string()),
                width,
                height,
                ..VideoStreamMetadata::default()
            },
            frame_size: (width, height),
            frame_count,
            probe_fails: false,
            probes: Cell::new(0),
            decodes: Cell::new(0),
        }
    }

    pub fn with_rotation_tag(mut self, rotation: i32) -> Self {
        self.metadata.rotation_tag = Some(rotation);
        self
    }

    pub fn with_failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }
}

impl Decoder for FakeDecoder {
    fn probe(&self, path: &Path) -> Result<VideoStreamMetadata, CaptureError> {
        self.probes.set(self.probes.get() + 1);
        if self.probe_fails {
            return Err(CaptureError::Probe {
                path: path.to_path_buf(),
                reason: "moov atom not found".to_string(),
            });
        }
        Ok(self.metadata.clone())
    }

    fn decode_frame(&self, path: &Path, frame_index: u64) -> Result<DynamicImage, CaptureError> {
        self.decodes.set(self.decodes.get() + 1);
        if frame_index >= self.frame_count {
            return Err(CaptureError::Decode {
                path: path.to_path_buf(),
                frame_index,
                reason: "end of stream reached before the requested frame".to_string(),
            });
        }
        let (width, height) = self.frame_size;
        let shade = (frame_index % 256) as u8;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([shade, 128, 255 - shade]),
        )))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
