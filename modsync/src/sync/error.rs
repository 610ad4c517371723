//! Error types for package synchronization.

use std::io;
use std::path::PathBuf;

use crate::package::ContentHash;

use super::enabled::StoreError;
use super::transfer::TransferError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Ways the host-declared package set can be malformed.
///
/// Any of these aborts the attempt before a single transfer is requested,
/// and the caller should drop the connection to the host.
#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// The host declared no packages at all.
    EmptyPackageList,

    /// No declared package has the core kind.
    NoCorePackage,

    /// More than one declared package has the core kind.
    MultipleCorePackages(usize),

    /// The host runs a different build of the client's base package, which
    /// cannot be fetched over a mod transfer.
    MissingBasePackage { name: String, remote: ContentHash },
}

impl std::fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPackageList => {
                write!(f, "the host declared an empty package list")
            }
            Self::NoCorePackage => {
                write!(f, "the host declared no core package")
            }
            Self::MultipleCorePackages(count) => {
                write!(f, "the host declared {} core packages", count)
            }
            Self::MissingBasePackage { name, remote } => {
                write!(
                    f,
                    "base package {} does not match the host (remote hash {})",
                    name, remote
                )
            }
        }
    }
}

/// Errors that abort a reconciliation attempt.
#[derive(Debug)]
pub enum SyncError {
    /// The host-declared set violated the protocol.
    Protocol(ProtocolViolation),

    /// The transport could not be reached to start a transfer.
    TransferRequest { name: String, reason: String },

    /// An in-flight transfer failed.
    TransferFailed { name: String, source: TransferError },

    /// A downloaded archive could not be decompressed.
    ArchiveCorrupt { path: PathBuf, reason: String },

    /// A decompressed artifact had no loadable package manifest.
    PackageLoad { path: PathBuf, reason: String },

    /// A downloaded artifact hashed differently than the host declared.
    HashMismatch {
        name: String,
        expected: ContentHash,
        actual: ContentHash,
    },

    /// A required package was neither downloaded nor locally matched when
    /// the enabled set was resolved. This is an internal-consistency defect,
    /// not a user-recoverable condition.
    UnresolvedPackage { name: String },

    /// The download staging directory could not be prepared.
    StagingDir { path: PathBuf, source: io::Error },

    /// Committing the enabled set failed.
    Commit(StoreError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protocol(violation) => write!(f, "protocol violation: {}", violation),
            Self::TransferRequest { name, reason } => {
                write!(f, "failed to request transfer of {}: {}", name, reason)
            }
            Self::TransferFailed { name, source } => {
                write!(f, "transfer of {} failed: {}", name, source)
            }
            Self::ArchiveCorrupt { path, reason } => {
                write!(f, "corrupt archive {}: {}", path.display(), reason)
            }
            Self::PackageLoad { path, reason } => {
                write!(
                    f,
                    "downloaded package at {} failed to load: {}",
                    path.display(),
                    reason
                )
            }
            Self::HashMismatch {
                name,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "hash mismatch for {}: expected {}, got {}",
                    name, expected, actual
                )
            }
            Self::UnresolvedPackage { name } => {
                write!(f, "package {} was never resolved during download", name)
            }
            Self::StagingDir { path, source } => {
                write!(
                    f,
                    "failed to prepare staging directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::Commit(e) => write!(f, "failed to commit enabled packages: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TransferFailed { source, .. } => Some(source),
            Self::StagingDir { source, .. } => Some(source),
            Self::Commit(e) => Some(e),
            _ => None,
        }
    }
}

impl SyncError {
    /// Check whether this error is a protocol violation by the host.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
