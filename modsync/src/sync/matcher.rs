//! Hash matching of host descriptors against local packages.
//!
//! Matching is pure and deterministic: a descriptor matches a local package
//! iff their content hashes are equal. Names play no part in identity: a
//! local package that shares a name but not a hash with a descriptor is
//! simply not a match.

use std::collections::HashMap;

use crate::package::{ContentHash, LocalPackage, ServerPackage};

/// One descriptor paired with its local match, if any.
#[derive(Debug, Clone)]
pub struct PackageMatch {
    /// The host-declared descriptor.
    pub server: ServerPackage,

    /// The hash-equal local package, when one exists.
    pub local: Option<LocalPackage>,
}

impl PackageMatch {
    /// Check whether this entry still needs a download.
    pub fn is_missing(&self) -> bool {
        self.local.is_none()
    }
}

/// Match every descriptor against the client's local packages by hash.
///
/// When two local packages share a hash (a duplicate install) the first one
/// in `local` wins; repeated calls over unchanged input always pick the same
/// one.
pub fn match_by_hash(server: &[ServerPackage], local: &[LocalPackage]) -> Vec<PackageMatch> {
    let mut index: HashMap<ContentHash, &LocalPackage> = HashMap::with_capacity(local.len());
    for package in local {
        index.entry(package.hash).or_insert(package);
    }

    server
        .iter()
        .map(|descriptor| PackageMatch {
            server: descriptor.clone(),
            local: index.get(&descriptor.hash).map(|&p| p.clone()),
        })
        .collect()
}

/// Extract the required-and-missing descriptors, preserving declaration order.
///
/// Optional descriptors never participate in downloads, so they are excluded
/// here even when unmatched. The core package is mandatory by definition and
/// is included no matter how the host flagged it.
pub fn missing_of(matches: &[PackageMatch]) -> Vec<ServerPackage> {
    matches
        .iter()
        .filter(|m| m.is_missing() && (m.server.required || m.server.kind.is_core()))
        .map(|m| m.server.clone())
        .collect()
}
