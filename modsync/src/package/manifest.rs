//! Package manifest parsing and content hashing.
//!
//! Every package directory carries a `modpack.json` manifest describing the
//! package identity and the ordered list of content files it ships. The
//! content hash of a package is computed over the manifest identity and every
//! listed file, so any change to the file list or to file contents produces a
//! different hash.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::hash::ContentHash;
use super::types::PackageKind;

/// Manifest filename expected at the root of every package directory.
pub const MANIFEST_FILENAME: &str = "modpack.json";

/// Buffer size for hashing content files (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Errors from loading or hashing a package manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest or content file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Manifest was not valid JSON of the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Manifest listed no content files.
    #[error("manifest lists no content files")]
    NoFiles,

    /// A file entry was absolute or escaped the package directory.
    #[error("unsafe file entry in manifest: {0}")]
    UnsafePath(String),
}

/// Parsed `modpack.json` manifest.
///
/// `synced` distinguishes content the host synchronizes from client-only
/// content (purely cosmetic mods a player enables locally); client-only
/// packages survive reconciliation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Display name of the package.
    pub name: String,

    /// Package version.
    pub version: Version,

    /// Core or regular.
    pub kind: PackageKind,

    /// Whether the host synchronizes this package's content.
    #[serde(default = "default_synced")]
    pub synced: bool,

    /// Workshop item id, when the package was published there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop_id: Option<u64>,

    /// Relative paths of every content file, in hashing order.
    pub files: Vec<String>,
}

fn default_synced() -> bool {
    true
}

impl PackageManifest {
    /// Load and validate the manifest from a package directory.
    pub fn load(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join(MANIFEST_FILENAME);
        let data = std::fs::read(&path).map_err(|e| ManifestError::Io {
            path: path.clone(),
            source: e,
        })?;

        let manifest: PackageManifest =
            serde_json::from_slice(&data).map_err(|e| ManifestError::Parse { path, source: e })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the file list.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.files.is_empty() {
            return Err(ManifestError::NoFiles);
        }
        for entry in &self.files {
            let path = Path::new(entry);
            let escapes = path.components().any(|c| {
                matches!(
                    c,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            });
            if escapes {
                return Err(ManifestError::UnsafePath(entry.clone()));
            }
        }
        Ok(())
    }

    /// Compute the package content hash rooted at `dir`.
    ///
    /// The digest covers the package name, the kind tag, and for each listed
    /// file its relative path followed by its contents, in manifest order.
    pub fn content_hash(&self, dir: &Path) -> Result<ContentHash, ManifestError> {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([self.kind.hash_tag()]);

        let mut buffer = vec![0u8; BUFFER_SIZE];
        for entry in &self.files {
            hasher.update(entry.as_bytes());

            let path = dir.join(entry);
            let mut file = File::open(&path).map_err(|e| ManifestError::Io {
                path: path.clone(),
                source: e,
            })?;
            loop {
                let bytes_read = file.read(&mut buffer).map_err(|e| ManifestError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }
        }

        Ok(ContentHash::from_bytes(hasher.finalize().into()))
    }
}
