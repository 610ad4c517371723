//! Package kind tag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a package within a host-declared set.
///
/// Exactly one package in a server's declared set is the core package (the
/// base content a client must run to match the host); everything else is a
/// regular package ("mod"). The distinction matters at finalize time: the
/// enabled configuration has a single core slot and an ordered regular list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// The single mandatory base package.
    Core,
    /// A non-core synchronized package.
    Regular,
}

impl PackageKind {
    /// Check if this is the core kind.
    pub fn is_core(&self) -> bool {
        matches!(self, PackageKind::Core)
    }

    /// Stable single-byte tag mixed into content hashes.
    pub(crate) fn hash_tag(&self) -> u8 {
        match self {
            PackageKind::Core => 0,
            PackageKind::Regular => 1,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageKind::Core => write!(f, "core"),
            PackageKind::Regular => write!(f, "regular"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(PackageKind::Core.to_string(), "core");
        assert_eq!(PackageKind::Regular.to_string(), "regular");
    }

    #[test]
    fn test_kind_is_core() {
        assert!(PackageKind::Core.is_core());
        assert!(!PackageKind::Regular.is_core());
    }

    #[test]
    fn test_kind_serde_lowercase() {
        assert_eq!(serde_json::to_string(&PackageKind::Core).unwrap(), "\"core\"");
        let kind: PackageKind = serde_json::from_str("\"regular\"").unwrap();
        assert_eq!(kind, PackageKind::Regular);
    }

    #[test]
    fn test_hash_tags_are_distinct() {
        assert_ne!(PackageKind::Core.hash_tag(), PackageKind::Regular.hash_tag());
    }
}
