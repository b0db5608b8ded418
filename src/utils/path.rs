use crate::error::{AdapterError, AdapterResult};
use std::path::Path;

const SEPARATOR: char = '/';

/// Checks a configured storage path once, when the adapter is built.
///
/// The path describes a filesystem-style root, so it has to be absolute.
pub fn validate_configured_path(path: &str) -> AdapterResult<()> {
    if path.starts_with(SEPARATOR) || Path::new(path).is_absolute() {
        Ok(())
    } else {
        Err(AdapterError::configuration(format!(
            "S3 path must be absolute, got '{}'",
            path
        )))
    }
}

/// Turns a configured path into a storage-relative prefix by dropping exactly
/// one leading separator.
pub fn resolve_path(configured: &str) -> String {
    configured
        .strip_prefix(SEPARATOR)
        .unwrap_or(configured)
        .to_string()
}

/// Remote object key for `filename` stored under `path`: always
/// `path + "/" + filename`.
///
/// The prefix is used as resolved, so the bucket root (`""`) gives `"/<name>"`
/// and a configured trailing separator (`"/images/"`) gives `"images//<name>"`.
pub fn join_key(path: &str, filename: &str) -> String {
    format!("{}{}{}", path, SEPARATOR, filename)
}
