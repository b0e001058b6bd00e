//! Filename sanitizing and upload validation.
//!
//! Everything here is pure. The web layer maps the returned errors to
//! 400 (type) and 413 (size) responses.

use super::{Category, IMAGE_MIME_TYPES, MAX_NAME_LENGTH, VIDEO_MIME_TYPES};
use crate::{Result, StudioError};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Turn an arbitrary filename into a provider-safe token.
///
/// Every character outside `[A-Za-z0-9._-]` becomes `_`, runs of
/// underscores collapse to one, and the result is cut to 255 characters.
/// Applying it twice gives the same result as applying it once.
pub fn sanitize_file_name(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len().min(MAX_NAME_LENGTH));
    let mut last_was_underscore = false;

    for c in filename.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };

        if c == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        out.push(c);
    }

    // Output is ASCII, so byte length equals char count
    out.truncate(MAX_NAME_LENGTH);
    out
}

/// Check a MIME type against the allow-list of a category given by its
/// wire name.
///
/// Returns the parsed category when the type is accepted.
pub fn validate_file_type(mime_type: &str, category: &str) -> Result<Category> {
    let category: Category = category.parse()?;
    let allowed = category.allowed_mime_types();

    if !allowed.contains(&mime_type) {
        return Err(StudioError::Validation(format!(
            "Invalid file type for {}. Expected {}",
            category,
            allowed.join(", ")
        )));
    }

    Ok(category)
}

/// Check a byte count against the configured ceiling.
pub fn validate_file_size(size: u64, max_size: u64) -> Result<()> {
    if size > max_size {
        return Err(StudioError::Quota(format!(
            "File size exceeds maximum allowed size of {}GB",
            gigabytes(max_size)
        )));
    }
    Ok(())
}

/// A byte count expressed in gigabytes, as shown in limit messages.
pub fn gigabytes(bytes: u64) -> String {
    format!("{}", bytes as f64 / BYTES_PER_GB)
}

/// Human-readable byte count.
///
/// Picks the largest unit (up to TB) in which the value is at least 1 and
/// rounds to two decimals: `1536` gives `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Lower-cased extension after the last dot, or an empty string.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Whether the MIME type is one of the accepted video types.
pub fn is_video_file(mime_type: &str) -> bool {
    VIDEO_MIME_TYPES.contains(&mime_type)
}

/// Whether the MIME type is one of the accepted image types.
pub fn is_image_file(mime_type: &str) -> bool {
    IMAGE_MIME_TYPES.contains(&mime_type)
}
