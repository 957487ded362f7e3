//! Storage URL derivation.

use crate::error::ServiceError;
use url::Url;

/// Path prefix of publicly readable objects.
pub const PUBLIC_OBJECT_PREFIX: [&str; 4] = ["storage", "v1", "object", "public"];

/// Path prefix of authenticated object access.
pub const OBJECT_PREFIX: [&str; 3] = ["storage", "v1", "object"];

/// Error code reported for paths that cannot name an object.
pub const INVALID_KEY_CODE: &str = "InvalidKey";

/// Returns the public URL of `bucket/path` under `base_url`.
///
/// Pure string computation: no request is made and nothing is checked
/// against the service, so the object need not exist. `.` and `..`
/// segments are dropped, so the URL always stays inside `bucket`.
pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    let mut segments: Vec<&str> = PUBLIC_OBJECT_PREFIX.to_vec();
    segments.push(bucket);
    segments.extend(split_object_path(path));
    join_url(base_url, &segments)
}

/// Splits an object path into segments, ignoring a leading slash.
pub fn split_object_path(path: &str) -> impl Iterator<Item = &str> {
    path.trim_start_matches('/').split('/')
}

/// Returns true if `path` can name an object.
///
/// A leading slash is ignored. What remains must be non-empty and free of
/// empty, `.` and `..` segments, since URL resolution would otherwise map
/// the path onto a different object.
pub fn is_valid_object_path(path: &str) -> bool {
    !path.trim_start_matches('/').is_empty()
        && split_object_path(path).all(|s| !matches!(s, "" | "." | ".."))
}

/// Rejects paths that [`is_valid_object_path`] refuses, with the error the
/// storage service reports for them.
pub fn check_object_path(path: &str) -> Result<(), ServiceError> {
    if is_valid_object_path(path) {
        Ok(())
    } else {
        Err(ServiceError::new(400, format!("Invalid key: {path}")).with_code(INVALID_KEY_CODE))
    }
}

/// Appends percent-encoded `segments` to `base_url`.
///
/// Falls back to plain concatenation when `base_url` is not a hierarchical
/// URL, so the result is always a string.
pub fn join_url(base_url: &str, segments: &[&str]) -> String {
    if let Ok(mut url) = Url::parse(base_url) {
        let joined = match url.path_segments_mut() {
            Ok(mut parts) => {
                parts.pop_if_empty().extend(segments);
                true
            }
            Err(()) => false,
        };
        if joined {
            return url.into();
        }
    }

    let mut out = base_url.trim_end_matches('/').to_string();
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}
