//! Locally resolvable packages and library discovery.
//!
//! A [`LocalPackage`] is a package whose content exists on disk with a
//! computed content hash. It may have come from the local library or from a
//! verified download; the sync subsystem treats both identically.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use super::hash::ContentHash;
use super::manifest::{ManifestError, PackageManifest, MANIFEST_FILENAME};
use super::types::PackageKind;

/// A package resolvable on the client, with its computed content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPackage {
    /// Display name from the manifest.
    pub name: String,

    /// Package version from the manifest.
    pub version: Version,

    /// Computed content hash.
    pub hash: ContentHash,

    /// Core or regular.
    pub kind: PackageKind,

    /// Whether the host synchronizes this package's content.
    ///
    /// Packages with `synced == false` are client-only: they stay enabled
    /// across reconciliation regardless of what the host declares.
    pub synced: bool,

    /// Directory the package content lives in.
    pub dir: PathBuf,
}

impl LocalPackage {
    /// Load a package from its directory: parse the manifest and compute the
    /// content hash.
    pub fn load(dir: &Path) -> Result<Self, ManifestError> {
        let manifest = PackageManifest::load(dir)?;
        let hash = manifest.content_hash(dir)?;
        Ok(Self::from_manifest(manifest, hash, dir))
    }

    /// Build from an already-parsed manifest and computed hash.
    pub fn from_manifest(manifest: PackageManifest, hash: ContentHash, dir: &Path) -> Self {
        Self {
            name: manifest.name,
            version: manifest.version,
            hash,
            kind: manifest.kind,
            synced: manifest.synced,
            dir: dir.to_path_buf(),
        }
    }

    /// Check if this is a client-only package (not host-synchronized).
    pub fn is_client_only(&self) -> bool {
        !self.synced
    }
}

/// Discover every loadable package under a library root.
///
/// Scans `<root>/*/modpack.json`; entries that fail to load are skipped with
/// a warning so one corrupt package cannot hide the rest of the library.
pub fn scan_library(root: &Path) -> Vec<LocalPackage> {
    let pattern = root.join("*").join(MANIFEST_FILENAME);
    let Some(pattern) = pattern.to_str().map(str::to_owned) else {
        tracing::warn!(root = %root.display(), "library root is not valid UTF-8, skipping scan");
        return Vec::new();
    };

    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(error = %e, "invalid library glob pattern");
            return Vec::new();
        }
    };

    let mut packages = Vec::new();
    for entry in paths.flatten() {
        let Some(dir) = entry.parent() else { continue };
        match LocalPackage::load(dir) {
            Ok(package) => {
                tracing::debug!(
                    name = %package.name,
                    hash = %package.hash.short(),
                    "discovered local package"
                );
                packages.push(package);
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unloadable package");
            }
        }
    }
    packages
}
