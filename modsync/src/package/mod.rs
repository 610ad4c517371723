//! Content package types and parsing.
//!
//! This module provides the data model the sync subsystem operates on:
//!
//! - **ContentHash**: content-addressed package identity (equal hash means
//!   byte-identical content)
//! - **PackageManifest**: the `modpack.json` file every package directory
//!   carries, and the content-hash computation it defines
//! - **ServerPackage**: one package as declared by a multiplayer host
//! - **LocalPackage**: a package resolvable on disk, from the library or
//!   from a verified download
//! - naming helpers shared by the transports and the verifier

mod hash;
mod local;
mod manifest;
mod naming;
mod server;
mod types;

pub use hash::{ContentHash, ParseHashError};
pub use local::{scan_library, LocalPackage};
pub use manifest::{ManifestError, PackageManifest, MANIFEST_FILENAME};
pub use naming::{archive_filename, package_dirname, sanitize_name, ARCHIVE_EXTENSION};
pub use server::{load_server_set, ServerPackage, ServerSetError};
pub use types::PackageKind;

// Re-export semver::Version for convenience
pub use semver::Version;
