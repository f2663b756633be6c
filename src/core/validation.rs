//! Upload filename validation
//!
//! Security-focused checks on the client-supplied filename:
//! - Traversal rejection (`..` segments)
//! - Directory stripping (only the last path component survives)
//! - Filename sanitization (remove filesystem-unsafe characters)
//! - Extension allow-list

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::error::AppError;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Client sent no filename or an empty one
    #[error("Empty filename")]
    EmptyFilename,

    /// Traversal attempt, or nothing usable left after sanitization
    #[error("Invalid filename")]
    InvalidFilename,

    /// Extension missing or not in the allow-list
    #[error("File type not allowed")]
    TypeNotAllowed,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Runs the full filename pipeline and returns the safe on-disk name.
///
/// # Arguments
/// * `declared` - Filename from the multipart `Content-Disposition`
/// * `allowed_extensions` - Lowercase allow-list, `None` skips the check
///
/// # Examples
/// ```
/// use tunnel::core::validation::{validate_filename, ValidationError};
///
/// assert_eq!(validate_filename(Some("docs/report.pdf"), None).unwrap(), "report.pdf");
/// assert_eq!(validate_filename(Some(""), None), Err(ValidationError::EmptyFilename));
/// assert_eq!(validate_filename(Some("../etc/passwd"), None), Err(ValidationError::InvalidFilename));
/// ```
pub fn validate_filename(
    declared: Option<&str>,
    allowed_extensions: Option<&BTreeSet<String>>,
) -> Result<String, ValidationError> {
    let declared = declared.unwrap_or("");
    if declared.trim().is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    if has_traversal(declared) {
        return Err(ValidationError::InvalidFilename);
    }

    let safe = sanitize_filename(declared);
    if safe.is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    if let Some(allowed) = allowed_extensions {
        match extension_of(&safe) {
            Some(ext) if allowed.contains(&ext) => {}
            _ => return Err(ValidationError::TypeNotAllowed),
        }
    }

    Ok(safe)
}

/// True when any `/` or `\` separated segment is `..`.
pub fn has_traversal(name: &str) -> bool {
    name.split(['/', '\\']).any(|segment| segment.trim() == "..")
}

/// Sanitizes a filename for use on disk.
///
/// Keeps only the last path component, then removes:
/// - Reserved characters: `:`, `*`, `?`, `"`, `<`, `>`, `|`
/// - Control characters (ASCII 0-31, 127)
/// - Leading dots and surrounding whitespace (no hidden files)
///
/// # Examples
/// ```
/// use tunnel::core::validation::sanitize_filename;
///
/// assert_eq!(sanitize_filename("video.mp4"), "video.mp4");
/// assert_eq!(sanitize_filename("C:\\Users\\me\\video:file.mp4"), "videofile.mp4");
/// assert_eq!(sanitize_filename("path/to/.hidden.txt"), "hidden.txt");
/// assert_eq!(sanitize_filename("file*.mp4"), "file.mp4");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = last
        .chars()
        .filter(|c| !['/', '\\', ':', '*', '?', '"', '<', '>', '|'].contains(c))
        .filter(|c| !c.is_control())
        .collect();

    cleaned
        .trim()
        .trim_start_matches('.')
        .trim_end_matches([' ', '.'])
        .to_string()
}

/// Lowercase extension after the last dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
