//! Rotation resolution and raster normalization tests.

mod common;

use std::path::Path;

use image::{DynamicImage, GenericImageView, RgbImage};
use imagecapture::{
    AspectRatio, CaptureError, Decoder, FfmpegDecoder, Orientation, VideoStreamMetadata,
    normalize_frame_rotation, probe::display_matrix_rotation, probe_rotation, resolve_rotation,
};

use common::{FakeDecoder, sample_video_path};

fn metadata(
    rotation_tag: Option<i32>,
    side_data_rotation: Option<i32>,
    display_aspect_ratio: Option<AspectRatio>,
) -> VideoStreamMetadata {
    VideoStreamMetadata {
        codec_type: "video".to_string(),
        width: 1920,
        height: 1080,
        rotation_tag,
        side_data_rotation,
        display_aspect_ratio,
        ..VideoStreamMetadata::default()
    }
}

fn blank(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
}

// ── resolve_rotation ──────────────────────────────────────────────

#[test]
fn explicit_tag_is_used() {
    assert_eq!(resolve_rotation(&metadata(Some(90), None, None)), 90);
    assert_eq!(resolve_rotation(&metadata(Some(270), None, AspectRatio::new(16, 9))), 270);
}

#[test]
fn no_signals_landscape_ratio_is_zero() {
    assert_eq!(resolve_rotation(&metadata(None, None, AspectRatio::new(16, 9))), 0);
}

#[test]
fn no_signals_portrait_ratio_is_ninety() {
    assert_eq!(resolve_rotation(&metadata(None, None, AspectRatio::new(9, 16))), 90);
}

#[test]
fn square_ratio_is_zero() {
    assert_eq!(resolve_rotation(&metadata(None, None, AspectRatio::new(1, 1))), 0);
}

#[test]
fn no_signals_and_no_ratio_is_zero() {
    assert_eq!(resolve_rotation(&metadata(None, None, None)), 0);
}

#[test]
fn side_data_is_subtracted_from_tag() {
    assert_eq!(resolve_rotation(&metadata(Some(90), Some(-90), None)), 180);
    assert_eq!(resolve_rotation(&metadata(None, Some(-90), None)), 90);
}

#[test]
fn cancelling_signals_fall_back_to_ratio() {
    // 90 - 90 == 0, so the landscape ratio decides.
    assert_eq!(resolve_rotation(&metadata(Some(90), Some(90), AspectRatio::new(16, 9))), 0);
    assert_eq!(resolve_rotation(&metadata(Some(90), Some(90), AspectRatio::new(9, 16))), 90);
}

#[test]
fn zero_side_data_is_ignored() {
    assert_eq!(resolve_rotation(&metadata(Some(180), Some(0), None)), 180);
}

#[test]
fn negative_result_is_preserved() {
    assert_eq!(resolve_rotation(&metadata(None, Some(90), AspectRatio::new(9, 16))), -90);
}

#[test]
fn aspect_ratio_parsing() {
    assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio { width: 16, height: 9 });
    assert!("0:1".parse::<AspectRatio>().is_err());
    assert!("N/A".parse::<AspectRatio>().is_err());
    assert_eq!(AspectRatio::new(4, 3).unwrap().to_string(), "4:3");
}

// ── display matrix ────────────────────────────────────────────────

#[test]
fn identity_matrix_has_no_rotation() {
    let identity = [65536, 0, 0, 0, 65536, 0, 0, 0, 1 << 30];
    assert_eq!(display_matrix_rotation(&identity), Some(0.0));
}

#[test]
fn portrait_phone_matrix_is_minus_ninety() {
    let portrait = [0, 65536, 0, -65536, 0, 0, 0, 0, 1 << 30];
    let rotation = display_matrix_rotation(&portrait).unwrap();
    assert!((rotation + 90.0).abs() < 1e-9, "got {rotation}");
}

#[test]
fn degenerate_matrix_is_none() {
    assert_eq!(display_matrix_rotation(&[0; 9]), None);
}

// ── normalize_frame_rotation ──────────────────────────────────────

#[test]
fn landscape_raster_with_quarter_turn_is_swapped() {
    let normalized = normalize_frame_rotation(blank(1920, 1080), 90);
    assert_eq!(normalized.dimensions(), (1080, 1920));

    let normalized = normalize_frame_rotation(blank(1920, 1080), 270);
    assert_eq!(normalized.dimensions(), (1080, 1920));
}

#[test]
fn portrait_raster_without_rotation_is_swapped() {
    let normalized = normalize_frame_rotation(blank(1080, 1920), 0);
    assert_eq!(normalized.dimensions(), (1920, 1080));

    let normalized = normalize_frame_rotation(blank(1080, 1920), 180);
    assert_eq!(normalized.dimensions(), (1920, 1080));
}

#[test]
fn agreeing_rasters_pass_through() {
    assert_eq!(normalize_frame_rotation(blank(1920, 1080), 0).dimensions(), (1920, 1080));
    assert_eq!(normalize_frame_rotation(blank(1920, 1080), 180).dimensions(), (1920, 1080));
    assert_eq!(normalize_frame_rotation(blank(1080, 1920), 90).dimensions(), (1080, 1920));
}

#[test]
fn unusual_angles_pass_through() {
    assert_eq!(normalize_frame_rotation(blank(1920, 1080), -90).dimensions(), (1920, 1080));
    assert_eq!(normalize_frame_rotation(blank(1080, 1920), 45).dimensions(), (1080, 1920));
}

#[test]
fn square_raster_is_treated_as_landscape() {
    assert_eq!(Orientation::of(64, 64), Orientation::Landscape);
    assert_eq!(normalize_frame_rotation(blank(64, 64), 90).dimensions(), (64, 64));
}

// ── probe_rotation ────────────────────────────────────────────────

#[test]
fn probe_rotation_reads_decoder_metadata() {
    let decoder = FakeDecoder::new(1920, 1080, 10).with_rotation_tag(90);
    let rotation = probe_rotation(&decoder, Path::new("clip.mp4")).unwrap();
    assert_eq!(rotation, 90);
    assert_eq!(decoder.probes.get(), 1);
}

#[test]
fn probe_rotation_propagates_probe_failure() {
    let decoder = FakeDecoder::new(1920, 1080, 10).with_failing_probe();
    let result = probe_rotation(&decoder, Path::new("clip.mp4"));
    assert!(matches!(result, Err(CaptureError::Probe { .. })));
}

#[test]
fn library_probe_of_fixture() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let metadata = FfmpegDecoder.probe(Path::new(path)).expect("Failed to probe fixture");
    assert_eq!(metadata.codec_type, "video");
    assert!(metadata.width > 0 && metadata.height > 0);
}

#[test]
fn library_probe_of_garbage_fails() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("garbage.mp4");
    std::fs::write(&path, b"this is not a media file").expect("Failed to write file");

    assert!(FfmpegDecoder.probe(&path).is_err());
}
