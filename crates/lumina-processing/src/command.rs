//! Guards shared by the external tool wrappers.

use std::path::Path;

use crate::error::{ProcessingError, ProcessingResult};

/// Tool binaries are configured by name or path; nothing else is allowed.
pub fn validate_binary(path: &str) -> ProcessingResult<()> {
    if path.is_empty()
        || !path.chars().all(|c| {
            c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\'
        })
    {
        return Err(ProcessingError::InvalidPath(format!(
            "Invalid tool path: {}",
            path
        )));
    }
    Ok(())
}

/// Validate that a path doesn't contain shell metacharacters or dangerous sequences
pub fn validate_path(path: &Path) -> ProcessingResult<()> {
    let path_str = path.to_string_lossy();
    let dangerous_chars = [';', '|', '&', '$', '`', '<', '>', '\n', '\r'];
    if path_str.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(ProcessingError::InvalidPath(format!(
            "Path contains dangerous characters: {}",
            path_str
        )));
    }

    if path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(ProcessingError::InvalidPath(format!(
            "Path contains directory traversal: {}",
            path_str
        )));
    }

    Ok(())
}
