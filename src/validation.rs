//! Remote file name checks.

use crate::{MegapoolError, Result};

/// Maximum allowed length for a remote file name.
const MAX_NAME_LENGTH: usize = 255;

/// Validates a remote file name.
///
/// Files live directly inside the shared remote folder, so a name must be
/// a single path component:
/// - not empty, not `.` or `..`
/// - at most 255 bytes
/// - no `/`, null bytes or control characters
///
/// # Errors
///
/// Returns [`MegapoolError::InvalidFileName`] if validation fails.
///
/// # Example
///
/// ```
/// use megapool::validation::validate_file_name;
///
/// assert!(validate_file_name("duplicity-full.20240101T000000Z.vol1.difftar.gpg").is_ok());
///
/// assert!(validate_file_name("").is_err());
/// assert!(validate_file_name("../etc/passwd").is_err());
/// assert!(validate_file_name("a\nb").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MegapoolError::InvalidFileName(
            "name cannot be empty".to_string(),
        ));
    }

    if name == "." || name == ".." {
        return Err(MegapoolError::InvalidFileName(format!(
            "'{}' is not a file name",
            name
        )));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(MegapoolError::InvalidFileName(format!(
            "name exceeds maximum length of {} bytes",
            MAX_NAME_LENGTH
        )));
    }

    if name.contains('/') {
        return Err(MegapoolError::InvalidFileName(format!(
            "'{}' contains a path separator",
            name
        )));
    }

    if name.contains('\0') {
        return Err(MegapoolError::InvalidFileName(
            "name contains null byte".to_string(),
        ));
    }

    if name.chars().any(char::is_control) {
        return Err(MegapoolError::InvalidFileName(
            "name contains control characters".to_string(),
        ));
    }

    Ok(())
}
