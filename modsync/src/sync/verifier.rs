//! Downloaded-artifact verification.
//!
//! A finished transfer is just bytes on disk until it survives this module:
//! the archive is unpacked, the resulting package manifest loaded, its
//! content hash computed and compared against the hash the host declared.
//! Integrity is the one property that is never weakened: any mismatch is
//! fatal to the whole attempt, never silently accepted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::package::{package_dirname, LocalPackage, PackageManifest, ServerPackage};

use super::error::{SyncError, SyncResult};
use super::extractor::{ArchiveExtractor, ExtractError};

/// Verifies downloaded archives against their descriptors.
pub struct ArtifactVerifier {
    extractor: Arc<dyn ArchiveExtractor>,
}

impl ArtifactVerifier {
    /// Create a verifier unpacking through the given extractor.
    pub fn new(extractor: Arc<dyn ArchiveExtractor>) -> Self {
        Self { extractor }
    }

    /// Unpack `archive`, load the package inside, and check its content hash
    /// against `target.hash`.
    ///
    /// The extracted directory is left on disk whether or not verification
    /// succeeds, so a mismatched artifact can be inspected; the staging area
    /// is wiped at the start of the next attempt.
    pub fn verify(&self, target: &ServerPackage, archive: &Path) -> SyncResult<LocalPackage> {
        let dest = extraction_dir(target, archive);

        // Both extractor failure modes are integrity failures from the
        // attempt's point of view.
        self.extractor.extract(archive, &dest).map_err(|e| match e {
            ExtractError::Corrupt { path, reason } | ExtractError::Failed { path, reason } => {
                SyncError::ArchiveCorrupt { path, reason }
            }
        })?;

        let manifest = PackageManifest::load(&dest).map_err(|e| SyncError::PackageLoad {
            path: dest.clone(),
            reason: e.to_string(),
        })?;
        let actual = manifest
            .content_hash(&dest)
            .map_err(|e| SyncError::PackageLoad {
                path: dest.clone(),
                reason: e.to_string(),
            })?;

        if actual != target.hash {
            tracing::warn!(
                name = %target.name,
                expected = %target.hash,
                actual = %actual,
                "downloaded artifact failed verification"
            );
            return Err(SyncError::HashMismatch {
                name: target.name.clone(),
                expected: target.hash,
                actual,
            });
        }

        tracing::debug!(name = %target.name, hash = %actual.short(), "artifact verified");
        Ok(LocalPackage::from_manifest(manifest, actual, &dest))
    }
}

/// Where an artifact gets unpacked: next to the archive, named after the
/// package and the expected hash so name collisions cannot clobber each
/// other.
fn extraction_dir(target: &ServerPackage, archive: &Path) -> PathBuf {
    let dirname = package_dirname(&target.name, &target.hash)
        .unwrap_or_else(|| format!("package_{}", target.hash.short()));
    archive
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(dirname)
}
