//! The process-wide enabled-package configuration.
//!
//! [`EnabledPackages`] owns the one piece of durable shared state in the
//! subsystem: which core package and which regular packages the client runs.
//! It is mutated in exactly one place (the reconciler's commit step), and
//! only after a backup has been taken, so a half-applied commit can always be
//! rolled back.
//!
//! With a configured path the current set is persisted as JSON on every
//! successful mutation, via write-to-temp-then-rename so a crash never leaves
//! a torn file. `back_up` also writes a `.bak` sibling, making the
//! backup/restore pair durable across a crash between the two commit writes.

use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::package::LocalPackage;

/// Errors from persisting or loading the enabled set.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// The set could not be encoded or decoded.
    #[error("failed to encode enabled set: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The enabled configuration: one core package and an ordered regular list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledSet {
    /// The enabled core package, if any configuration has been committed.
    pub core: Option<LocalPackage>,

    /// Enabled regular packages, in load order.
    pub regular: Vec<LocalPackage>,
}

#[derive(Debug, Default)]
struct Inner {
    current: EnabledSet,
    backup: Option<EnabledSet>,
}

/// Store for the enabled-package configuration.
///
/// Reads are cheap snapshots; writes go through `set_core`/`set_regular`,
/// which persist before returning. While a reconciliation attempt is in
/// progress nothing else may write; the reconciler is the single writer.
#[derive(Debug)]
pub struct EnabledPackages {
    inner: RwLock<Inner>,
    path: Option<PathBuf>,
}

impl EnabledPackages {
    /// Create a store with no persistence (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            path: None,
        }
    }

    /// Create a store backed by `path`, loading the existing set if the file
    /// is present.
    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let current = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => EnabledSet::default(),
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };

        Ok(Self {
            inner: RwLock::new(Inner {
                current,
                backup: None,
            }),
            path: Some(path),
        })
    }

    /// Point-in-time copy of the enabled set.
    pub fn snapshot(&self) -> EnabledSet {
        self.inner.read().current.clone()
    }

    /// Capture the current set as the rollback point for an imminent commit.
    ///
    /// Supersedes any previous backup. With persistence configured the
    /// backup is also written to a `.bak` sibling file.
    pub fn back_up(&self) -> Result<(), StoreError> {
        let snapshot = {
            let mut inner = self.inner.write();
            let snapshot = inner.current.clone();
            inner.backup = Some(snapshot.clone());
            snapshot
        };

        if let Some(bak) = self.backup_path() {
            write_atomic(&bak, &snapshot)?;
        }
        Ok(())
    }

    /// Roll back to the last backup. Returns false when no backup exists.
    ///
    /// Restoring is a compensation path: if persisting the restored set
    /// fails, the in-memory state is still rolled back and the failure is
    /// logged rather than propagated.
    pub fn restore_backup(&self) -> bool {
        let restored = {
            let mut inner = self.inner.write();
            match inner.backup.take() {
                Some(backup) => {
                    inner.current = backup.clone();
                    backup
                }
                None => return false,
            }
        };

        if let Some(path) = &self.path {
            if let Err(e) = write_atomic(path, &restored) {
                tracing::error!(error = %e, "failed to persist restored enabled set");
            }
        }
        true
    }

    /// Replace the enabled core package and persist.
    pub fn set_core(&self, core: LocalPackage) -> Result<(), StoreError> {
        let updated = {
            let mut inner = self.inner.write();
            inner.current.core = Some(core);
            inner.current.clone()
        };
        self.persist(&updated)
    }

    /// Replace the enabled regular list and persist.
    pub fn set_regular(&self, regular: Vec<LocalPackage>) -> Result<(), StoreError> {
        let updated = {
            let mut inner = self.inner.write();
            inner.current.regular = regular;
            inner.current.clone()
        };
        self.persist(&updated)
    }

    fn persist(&self, set: &EnabledSet) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => write_atomic(path, set),
            None => Ok(()),
        }
    }

    fn backup_path(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        let file_name = path.file_name()?.to_string_lossy();
        Some(path.with_file_name(format!("{file_name}.bak")))
    }
}

/// Serialize `set` to `path` via a temp file and rename, so readers never
/// observe a torn write.
fn write_atomic(path: &std::path::Path, set: &EnabledSet) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let data = serde_json::to_vec_pretty(set)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data).map_err(|e| StoreError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use semver::Version;
    use tempfile::TempDir;

    use crate::package::{ContentHash, PackageKind};

    use super::*;

    fn package(name: &str, kind: PackageKind) -> LocalPackage {
        LocalPackage {
            name: name.to_string(),
            version: Version::new(1, 0, 0),
            hash: ContentHash::of_bytes(name.as_bytes()),
            kind,
            synced: true,
            dir: PathBuf::from(format!("/library/{name}")),
        }
    }

    #[test]
    fn test_in_memory_set_and_snapshot() {
        let store = EnabledPackages::in_memory();
        assert_eq!(store.snapshot(), EnabledSet::default());

        store.set_core(package("BaseGame", PackageKind::Core)).unwrap();
        store
            .set_regular(vec![package("SciFiPack", PackageKind::Regular)])
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.core.unwrap().name, "BaseGame");
        assert_eq!(snapshot.regular.len(), 1);
    }

    #[test]
    fn test_backup_and_restore() {
        let store = EnabledPackages::in_memory();
        store.set_core(package("BaseGame", PackageKind::Core)).unwrap();
        let before = store.snapshot();

        store.back_up().unwrap();
        store.set_core(package("OtherCore", PackageKind::Core)).unwrap();
        store
            .set_regular(vec![package("SciFiPack", PackageKind::Regular)])
            .unwrap();
        assert_ne!(store.snapshot(), before);

        assert!(store.restore_backup());
        assert_eq!(store.snapshot(), before);

        // Backup is consumed by restore.
        assert!(!store.restore_backup());
    }

    #[test]
    fn test_restore_without_backup() {
        let store = EnabledPackages::in_memory();
        assert!(!store.restore_backup());
    }

    #[test]
    fn test_persistence_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("enabled.json");

        {
            let store = EnabledPackages::at_path(&path).unwrap();
            store.set_core(package("BaseGame", PackageKind::Core)).unwrap();
            store
                .set_regular(vec![
                    package("SciFiPack", PackageKind::Regular),
                    package("UITheme", PackageKind::Regular),
                ])
                .unwrap();
        }

        let reloaded = EnabledPackages::at_path(&path).unwrap();
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.core.unwrap().name, "BaseGame");
        let names: Vec<&str> = snapshot.regular.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["SciFiPack", "UITheme"]);
    }

    #[test]
    fn test_backup_writes_bak_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("enabled.json");

        let store = EnabledPackages::at_path(&path).unwrap();
        store.set_core(package("BaseGame", PackageKind::Core)).unwrap();
        store.back_up().unwrap();

        let bak = temp.path().join("enabled.json.bak");
        assert!(bak.exists());

        let backed: EnabledSet =
            serde_json::from_slice(&std::fs::read(&bak).unwrap()).unwrap();
        assert_eq!(backed.core.unwrap().name, "BaseGame");
    }

    #[test]
    fn test_at_path_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = EnabledPackages::at_path(temp.path().join("enabled.json")).unwrap();
        assert_eq!(store.snapshot(), EnabledSet::default());
    }

    #[test]
    fn test_set_fails_when_path_is_a_directory() {
        let temp = TempDir::new().unwrap();
        // The store path itself is a directory: rename onto it fails.
        let store = EnabledPackages {
            inner: RwLock::new(Inner::default()),
            path: Some(temp.path().to_path_buf()),
        };

        let result = store.set_regular(vec![package("SciFiPack", PackageKind::Regular)]);
        assert!(matches!(result, Err(StoreError::Io { .. })));
    }
}
