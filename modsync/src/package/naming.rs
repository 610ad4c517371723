//! Centralized artifact naming conventions.
//!
//! This module is the single source of truth for how downloaded artifacts
//! are named in the staging area:
//! - Archive filenames (e.g., `SciFiPack.mspkg`)
//! - Extracted package directory names (e.g., `SciFiPack_b94d27b9`)
//!
//! All other modules should use these functions rather than constructing
//! names directly, so the transports and the verifier always agree.

use regex::Regex;
use std::sync::OnceLock;

use super::hash::ContentHash;

/// Archive extension used for packaged mod content.
pub const ARCHIVE_EXTENSION: &str = "mspkg";

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static pattern"))
}

/// Reduce a package name to a filesystem-safe form.
///
/// Anything outside `[A-Za-z0-9._-]` collapses to `_`. Returns `None` when
/// nothing safe remains, so callers can reject the name before issuing any
/// request with it.
///
/// # Examples
///
/// ```
/// use modsync::package::sanitize_name;
///
/// assert_eq!(sanitize_name("SciFi Pack"), Some("SciFi_Pack".to_string()));
/// assert_eq!(sanitize_name("../../etc"), Some(".._.._etc".to_string()));
/// assert_eq!(sanitize_name(""), None);
/// ```
pub fn sanitize_name(name: &str) -> Option<String> {
    let safe = unsafe_chars().replace_all(name, "_").into_owned();
    let trimmed = safe.trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(safe)
}

/// Archive filename for a package, as served by every transport.
///
/// # Examples
///
/// ```
/// use modsync::package::archive_filename;
///
/// assert_eq!(archive_filename("SciFiPack"), Some("SciFiPack.mspkg".to_string()));
/// ```
pub fn archive_filename(name: &str) -> Option<String> {
    Some(format!("{}.{}", sanitize_name(name)?, ARCHIVE_EXTENSION))
}

/// Directory name a verified artifact is extracted into.
///
/// The hash prefix keeps two packages that share a display name from
/// colliding in the staging area.
pub fn package_dirname(name: &str, hash: &ContentHash) -> Option<String> {
    Some(format!("{}_{}", sanitize_name(name)?, hash.short()))
}
