//! Host-declared package descriptors.
//!
//! A [`ServerPackage`] is the authoritative record a multiplayer host
//! declares for one content package. Identity is `(name, hash)`; the hash is
//! what the client matches against its local library, requests transfers by,
//! and verifies downloaded artifacts against.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::hash::ContentHash;
use super::types::PackageKind;

/// One package as declared by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPackage {
    /// Display name, as the host reports it.
    pub name: String,

    /// Content hash of the package the host is running.
    pub hash: ContentHash,

    /// Workshop item id, when the host sourced the package from there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop_id: Option<u64>,

    /// Core or regular.
    pub kind: PackageKind,

    /// Whether a client must run this package to join.
    ///
    /// Hosts may declare optional content (e.g. submarine files fetched on
    /// demand mid-session); optional entries are never queued for download
    /// and are skipped when the enabled set is resolved.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ServerPackage {
    /// Create a required descriptor.
    pub fn new(name: impl Into<String>, hash: ContentHash, kind: PackageKind) -> Self {
        Self {
            name: name.into(),
            hash,
            workshop_id: None,
            kind,
            required: true,
        }
    }

    /// Set the workshop id (builder pattern).
    pub fn with_workshop_id(mut self, id: u64) -> Self {
        self.workshop_id = Some(id);
        self
    }

    /// Mark the descriptor as optional (builder pattern).
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Errors from reading a host-exported descriptor file.
#[derive(Debug, thiserror::Error)]
pub enum ServerSetError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File was not a JSON array of descriptors.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load a host-exported descriptor set (a JSON array of [`ServerPackage`]).
pub fn load_server_set(path: &Path) -> Result<Vec<ServerPackage>, ServerSetError> {
    let data = std::fs::read(path).map_err(|e| ServerSetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_slice(&data).map_err(|e| ServerSetError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
