//! `ffprobe` JSON parsing tests.

use std::path::Path;

use imagecapture::{AspectRatio, CaptureError, resolve_rotation, subprocess::parse_ffprobe_json};

fn parse(document: &str) -> Result<imagecapture::VideoStreamMetadata, CaptureError> {
    parse_ffprobe_json(document.as_bytes(), Path::new("clip.mp4"))
}

#[test]
fn plain_landscape_stream() {
    let metadata = parse(
        r#"{"streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264",
             "width": 1920, "height": 1080, "display_aspect_ratio": "16:9"}
        ]}"#,
    )
    .unwrap();

    assert_eq!(metadata.codec_name.as_deref(), Some("h264"));
    assert_eq!((metadata.width, metadata.height), (1920, 1080));
    assert_eq!(metadata.rotation_tag, None);
    assert_eq!(metadata.display_aspect_ratio, AspectRatio::new(16, 9));
    assert_eq!(resolve_rotation(&metadata), 0);
}

#[test]
fn first_video_stream_is_selected() {
    let metadata = parse(
        r#"{"streams": [
            {"codec_type": "audio", "codec_name": "aac"},
            {"codec_type": "video", "codec_name": "hevc", "width": 640, "height": 360},
            {"codec_type": "video", "codec_name": "mjpeg", "width": 100, "height": 100}
        ]}"#,
    )
    .unwrap();

    assert_eq!(metadata.codec_name.as_deref(), Some("hevc"));
}

#[test]
fn rotate_tag_is_read() {
    let metadata = parse(
        r#"{"streams": [
            {"codec_type": "video", "width": 1920, "height": 1080, "tags": {"rotate": "90"}}
        ]}"#,
    )
    .unwrap();

    assert_eq!(metadata.rotation_tag, Some(90));
    assert_eq!(resolve_rotation(&metadata), 90);
}

#[test]
fn phone_side_data_is_read() {
    let metadata = parse(
        r#"{"streams": [
            {"codec_type": "video", "width": 1920, "height": 1080,
             "side_data_list": [
                {"side_data_type": "Display Matrix", "displaymatrix": "...", "rotation": -90}
             ]}
        ]}"#,
    )
    .unwrap();

    assert_eq!(metadata.side_data_rotation, Some(-90));
    assert_eq!(resolve_rotation(&metadata), 90);
}

#[test]
fn only_first_side_data_entry_counts() {
    let metadata = parse(
        r#"{"streams": [
            {"codec_type": "video", "width": 1920, "height": 1080,
             "side_data_list": [
                {"side_data_type": "Content light level metadata"},
                {"side_data_type": "Display Matrix", "rotation": -90}
             ]}
        ]}"#,
    )
    .unwrap();

    assert_eq!(metadata.side_data_rotation, None);
}

#[test]
fn unknown_aspect_ratio_is_absent() {
    for ratio in ["N/A", "0:1", "garbage"] {
        let document = format!(
            r#"{{"streams": [{{"codec_type": "video", "width": 8, "height": 8, "display_aspect_ratio": "{ratio}"}}]}}"#
        );
        assert_eq!(parse(&document).unwrap().display_aspect_ratio, None, "{ratio}");
    }
}

#[test]
fn no_video_stream_is_an_error() {
    let result = parse(r#"{"streams": [{"codec_type": "audio"}]}"#);
    assert!(matches!(result, Err(CaptureError::NoVideoStream(_))));

    let result = parse(r#"{}"#);
    assert!(matches!(result, Err(CaptureError::NoVideoStream(_))));
}

#[test]
fn malformed_documents_are_probe_errors() {
    assert!(matches!(parse("not json"), Err(CaptureError::Probe { .. })));

    let result = parse(r#"{"streams": [{"codec_type": "video", "tags": {"rotate": "sideways"}}]}"#);
    assert!(matches!(result, Err(CaptureError::Probe { .. })));
}
