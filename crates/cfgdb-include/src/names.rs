//! Include path validation.
//!
//! Include paths are stored as written. A valid include path:
//! - is non-empty
//! - has no leading or trailing whitespace
//! - contains no control characters (newlines included)

use crate::error::{IncludeError, Result};

/// Validate an include path as declared in a data file.
///
/// # Examples
///
/// ```
/// use cfgdb_include::names::validate_include_path;
///
/// assert!(validate_include_path("daq/segments.data.json").is_ok());
/// assert!(validate_include_path("").is_err());
/// assert!(validate_include_path("a\nb").is_err());
/// ```
pub fn validate_include_path(path: &str) -> Result<()> {
    let reason = if path.is_empty() {
        "must not be empty"
    } else if path.trim() != path {
        "must not start or end with whitespace"
    } else if path.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };
    Err(IncludeError::InvalidPath {
        path: path.to_string(),
        reason: reason.into(),
    })
}
