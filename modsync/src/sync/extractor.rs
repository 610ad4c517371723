//! Archive extraction collaborator.
//!
//! Decompression internals are not this subsystem's business: the verifier
//! drives extraction through the [`ArchiveExtractor`] seam and only cares
//! whether the archive unpacked cleanly. [`ShellExtractor`] is the default
//! implementation, using the system `tar` the publisher side creates
//! archives with.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Errors from unpacking an archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The archive was malformed or truncated.
    #[error("corrupt archive {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The extraction tool could not be run or the destination prepared.
    #[error("extraction failed for {path}: {reason}")]
    Failed { path: PathBuf, reason: String },
}

/// External decompression collaborator.
pub trait ArchiveExtractor: Send + Sync {
    /// Unpack `archive` into `dest_dir`, creating the directory as needed.
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), ExtractError>;
}

/// Shell-based archive extractor.
///
/// Uses the system `tar` for extraction, matching the tooling used to
/// produce `.mspkg` archives (gzipped tarballs of a package directory).
#[derive(Debug, Default)]
pub struct ShellExtractor;

impl ShellExtractor {
    /// Create a new shell-based extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ShellExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
        std::fs::create_dir_all(dest_dir).map_err(|e| ExtractError::Failed {
            path: archive.to_path_buf(),
            reason: format!("cannot create {}: {}", dest_dir.display(), e),
        })?;

        let output = Command::new("tar")
            .args([
                "-xzf",
                archive.to_str().unwrap_or(""),
                "-C",
                dest_dir.to_str().unwrap_or(""),
            ])
            .output()
            .map_err(|e| ExtractError::Failed {
                path: archive.to_path_buf(),
                reason: format!("failed to run tar: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Corrupt {
                path: archive.to_path_buf(),
                reason: format!("tar extraction failed: {}", stderr.trim()),
            });
        }

        Ok(())
    }
}
