//! Collision-free output naming.
//!
//! Captures of `/videos/clip.mp4` are named `/videos/clip_000.jpg`,
//! `/videos/clip_001.jpg`, and so on. The next name is one past the highest
//! numeric suffix among the images that already share the prefix, so gaps
//! left by deleted captures are never refilled.
//!
//! # Example
//!
//! ```
//! use imagecapture::generate_output_path;
//!
//! let existing = ["/v/foo_000.jpg", "/v/foo_002.jpg"];
//! assert_eq!(generate_output_path(existing, "/v/foo.mp4").unwrap(), "/v/foo_003.jpg");
//! ```

use std::{io, path::Path};

use crate::error::CaptureError;

/// Separator between the video stem and the capture number.
pub const SUFFIX_SEPARATOR: char = '_';

/// Extension of written captures.
pub const CAPTURE_EXTENSION: &str = "jpg";

/// The video path without its extension, plus [`SUFFIX_SEPARATOR`].
pub fn output_prefix(video_path: &str) -> String {
    let path = Path::new(video_path);
    let stem = match path.extension() {
        Some(extension) => {
            let cut = video_path.len() - extension.len() - 1;
            &video_path[..cut]
        }
        None => video_path,
    };
    format!("{stem}{SUFFIX_SEPARATOR}")
}

/// Anchored regular expression matching every path that starts with `prefix`
/// literally. This is the pattern handed to the host's image search.
pub fn prefix_pattern(prefix: &str) -> String {
    format!("^{}.*$", regex::escape(prefix))
}

/// Numeric suffix of a capture path: the text after the last separator in the
/// file stem, if it is all ASCII digits.
pub fn capture_index(image_path: &str) -> Option<u64> {
    let stem = Path::new(image_path).file_stem()?.to_str()?;
    let suffix = stem.rsplit(SUFFIX_SEPARATOR).next()?;
    if suffix.is_empty() || !suffix.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<u64>().ok()
}

/// Highest capture index among `existing` paths that start with `prefix`.
pub fn current_index<I, S>(existing: I, prefix: &str) -> Option<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    existing
        .into_iter()
        .filter(|path| path.as_ref().starts_with(prefix))
        .filter_map(|path| capture_index(path.as_ref()))
        .max()
}

/// Next free capture path for `video_path`, given every existing image path
/// that shares its prefix.
///
/// Paths not starting with the prefix are ignored, as are non-numeric
/// suffixes. With no numbered match the index starts at `000`.
///
/// # Errors
///
/// Returns [`CaptureError::NamingExhausted`] when the highest existing index
/// is `u64::MAX`, since no larger number is left to hand out.
pub fn generate_output_path<I, S>(existing: I, video_path: &str) -> Result<String, CaptureError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = output_prefix(video_path);
    let next = match current_index(existing, &prefix) {
        None => 0,
        Some(last) => last
            .checked_add(1)
            .ok_or_else(|| CaptureError::NamingExhausted {
                prefix: prefix.clone(),
                last,
            })?,
    };
    Ok(format!("{prefix}{next:03}.{CAPTURE_EXTENSION}"))
}

/// Files next to `video_path` that share its capture prefix.
///
/// Used when no host catalog is available and the filesystem itself is the
/// authority on which captures exist.
pub fn existing_captures_on_disk(video_path: &str) -> io::Result<Vec<String>> {
    let prefix = output_prefix(video_path);
    // A bare file name lists the working directory and compares bare names.
    let parent = Path::new(video_path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty());
    let directory = parent.unwrap_or(Path::new("."));

    let mut captures = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let path = match parent {
            Some(_) => entry.path().to_string_lossy().into_owned(),
            None => entry.file_name().to_string_lossy().into_owned(),
        };
        if path.starts_with(&prefix) {
            captures.push(path);
        }
    }
    captures.sort();
    Ok(captures)
}
