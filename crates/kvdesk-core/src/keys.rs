//! Key path helpers and local input validation.
//!
//! Keys are `/`-delimited paths. A path ending in `/` names a directory; the
//! namespace root is `/`.

use crate::error::{StoreError, StoreResult};

/// The namespace root.
pub const ROOT: &str = "/";
/// Maximum key length in characters.
pub const MAX_KEY_LENGTH: usize = 1024;
/// Maximum value size in bytes (1 MiB).
pub const MAX_VALUE_SIZE: usize = 1_048_576;
/// Maximum connection name length in characters.
pub const MAX_CONNECTION_NAME: usize = 50;

/// Display label of a key: its last non-empty segment.
pub fn key_name(key: &str) -> &str {
    key.split('/').filter(|s| !s.is_empty()).last().unwrap_or(key)
}

pub fn is_dir_key(key: &str) -> bool {
    key.ends_with('/')
}

/// Normalize a listing prefix: empty means root, and it always ends in `/`.
pub fn dir_prefix(path: &str) -> String {
    if path.is_empty() {
        return ROOT.to_string();
    }
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Directory that lists `key` as an immediate child.
///
/// `/foo/bar` and `/foo/bar/` both live in `/foo/`; the root is its own parent.
pub fn parent_dir(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => ROOT.to_string(),
    }
}

/// All directories above `key`, from the root down to its immediate parent.
pub fn ancestors(key: &str) -> Vec<String> {
    let mut dirs = vec![ROOT.to_string()];
    let trimmed = key.trim_end_matches('/');
    let mut current = String::from(ROOT);
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        current.push_str(segment);
        current.push('/');
        dirs.push(current.clone());
    }
    dirs
}

/// Join a directory and a user-typed name into a full key.
pub fn join_key(parent: &str, name: &str) -> String {
    format!("{}{}", dir_prefix(parent), name.trim_start_matches('/'))
}

/// Keys must be non-empty, start with `/` and stay within [`MAX_KEY_LENGTH`].
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::Validation("key cannot be empty".to_string()));
    }
    if !key.starts_with('/') {
        return Err(StoreError::Validation(format!(
            "key must start with '/': {}",
            key
        )));
    }
    if key.chars().count() > MAX_KEY_LENGTH {
        return Err(StoreError::Validation(format!(
            "key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// User-typed key names may only contain letters, digits, `_`, `-`, `.` and `/`.
pub fn validate_key_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("key name cannot be empty".to_string()));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')))
    {
        return Err(StoreError::Validation(format!(
            "key name contains invalid character '{}'",
            c
        )));
    }
    Ok(())
}

pub fn validate_value(value: &str) -> StoreResult<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(StoreError::Validation(format!(
            "value size {} bytes exceeds maximum of {} bytes",
            value.len(),
            MAX_VALUE_SIZE
        )));
    }
    Ok(())
}

/// Endpoints must be `http://` or `https://` URLs with a host.
pub fn validate_endpoint(endpoint: &str) -> StoreResult<()> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(StoreError::Validation("endpoint cannot be empty".to_string()));
    }
    let rest = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .ok_or_else(|| {
            StoreError::Validation(format!(
                "endpoint must use http or https scheme: {}",
                endpoint
            ))
        })?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.starts_with(':') {
        return Err(StoreError::Validation(format!(
            "endpoint must include a host: {}",
            endpoint
        )));
    }
    Ok(())
}

pub fn validate_endpoints(endpoints: &[String]) -> StoreResult<()> {
    if endpoints.is_empty() {
        return Err(StoreError::Validation(
            "at least one endpoint is required".to_string(),
        ));
    }
    endpoints.iter().try_for_each(|e| validate_endpoint(e))
}

/// Connection names: non-empty, at most [`MAX_CONNECTION_NAME`] characters of
/// `[A-Za-z0-9_-]`.
pub fn validate_connection_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::Validation(
            "connection name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_CONNECTION_NAME {
        return Err(StoreError::Validation(format!(
            "connection name exceeds maximum length of {} characters",
            MAX_CONNECTION_NAME
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
    {
        return Err(StoreError::Validation(format!(
            "connection name contains invalid character '{}', only alphanumeric, '-', and '_' allowed",
            c
        )));
    }
    Ok(())
}
