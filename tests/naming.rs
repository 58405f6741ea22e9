//! Output naming tests.

use std::fs;

use imagecapture::{
    CaptureError, generate_output_path,
    naming::{capture_index, current_index, existing_captures_on_disk, output_prefix, prefix_pattern},
};
use regex::Regex;

const NONE: [&str; 0] = [];

#[test]
fn first_capture_is_zero() {
    assert_eq!(generate_output_path(NONE, "/v/foo.mp4").unwrap(), "/v/foo_000.jpg");
}

#[test]
fn next_after_highest_suffix() {
    let existing = ["/v/foo_000.jpg", "/v/foo_002.jpg"];
    assert_eq!(generate_output_path(existing, "/v/foo.mp4").unwrap(), "/v/foo_003.jpg");
}

#[test]
fn gaps_are_not_refilled() {
    let existing = ["/v/foo_007.jpg"];
    assert_eq!(generate_output_path(existing, "/v/foo.mp4").unwrap(), "/v/foo_008.jpg");
}

#[test]
fn non_numeric_suffixes_are_ignored() {
    let existing = ["/v/foo_bar.jpg", "/v/foo_cover.png"];
    assert_eq!(generate_output_path(existing, "/v/foo.mp4").unwrap(), "/v/foo_000.jpg");
}

#[test]
fn other_prefixes_are_ignored() {
    let existing = ["/v/foobar_009.jpg", "/w/foo_005.jpg", "/v/foo_001.jpg"];
    assert_eq!(generate_output_path(existing, "/v/foo.mp4").unwrap(), "/v/foo_002.jpg");
}

#[test]
fn index_grows_past_three_digits() {
    let existing = ["/v/foo_999.jpg"];
    assert_eq!(generate_output_path(existing, "/v/foo.mp4").unwrap(), "/v/foo_1000.jpg");
}

#[test]
fn largest_index_is_not_wrapped_around() {
    let existing = ["/v/foo_000.jpg", "/v/foo_18446744073709551615.jpg"];
    let error = generate_output_path(existing, "/v/foo.mp4").unwrap_err();
    assert!(matches!(
        error,
        CaptureError::NamingExhausted { last: u64::MAX, .. }
    ));
}

#[test]
fn suffix_beyond_u64_is_not_a_capture_index() {
    let existing = ["/v/foo_004.jpg", "/v/foo_99999999999999999999.jpg"];
    assert_eq!(generate_output_path(existing, "/v/foo.mp4").unwrap(), "/v/foo_005.jpg");
}

#[test]
fn only_the_last_extension_is_stripped() {
    assert_eq!(output_prefix("/v/show.s01e02.mkv"), "/v/show.s01e02_");
    assert_eq!(output_prefix("/v/no_extension"), "/v/no_extension_");
}

#[test]
fn capture_index_reads_trailing_digits() {
    assert_eq!(capture_index("/v/foo_012.jpg"), Some(12));
    assert_eq!(capture_index("/v/my_clip_3.jpg"), Some(3));
    assert_eq!(capture_index("/v/foo_.jpg"), None);
    assert_eq!(capture_index("/v/foo_1a.jpg"), None);
}

#[test]
fn current_index_is_none_without_matches() {
    assert_eq!(current_index(["/v/other_001.jpg"], "/v/foo_"), None);
    assert_eq!(current_index(["/v/foo_004.jpg", "/v/foo_002.jpg"], "/v/foo_"), Some(4));
}

#[test]
fn pattern_escapes_metacharacters() {
    let prefix = output_prefix("/v/a.b (1) [x]+.mp4");
    let pattern = Regex::new(&prefix_pattern(&prefix)).unwrap();

    assert!(pattern.is_match("/v/a.b (1) [x]+_000.jpg"));
    assert!(!pattern.is_match("/v/aXb (1) [x]+_000.jpg"));
    assert!(!pattern.is_match("/other/v/a.b (1) [x]+_000.jpg"));
}

#[test]
fn naming_with_special_characters() {
    let existing = ["/v/a.b (1)_004.jpg"];
    assert_eq!(generate_output_path(existing, "/v/a.b (1).mp4").unwrap(), "/v/a.b (1)_005.jpg");
}

#[test]
fn disk_scan_lists_sibling_captures() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let video = directory.path().join("clip.mp4");
    for name in ["clip.mp4", "clip_000.jpg", "clip_003.jpg", "clips_009.jpg", "other.jpg"] {
        fs::write(directory.path().join(name), b"").expect("Failed to write file");
    }

    let video = video.to_str().unwrap();
    let existing = existing_captures_on_disk(video).unwrap();
    assert_eq!(existing.len(), 2);
    assert_eq!(
        generate_output_path(&existing, video).unwrap(),
        directory.path().join("clip_004.jpg").to_str().unwrap()
    );
}

#[test]
fn disk_scan_of_missing_folder_fails() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let video = directory.path().join("missing").join("clip.mp4");
    assert!(existing_captures_on_disk(video.to_str().unwrap()).is_err());
}
