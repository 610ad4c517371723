//! Content-addressed package identity.
//!
//! A [`ContentHash`] is the SHA-256 digest of a package's manifest identity
//! and every content file it lists. Two packages with equal hashes carry
//! byte-identical content; everything in the sync subsystem keys off this
//! digest rather than package names.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Buffer size for hashing file contents (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Errors produced when parsing a hash from its hex form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseHashError {
    /// Input did not decode as hex.
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    /// Input decoded but was not 32 bytes.
    #[error("digest has wrong length: expected 32 bytes, got {0}")]
    WrongLength(usize),
}

/// SHA-256 digest identifying package content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap a raw 32-byte digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a byte slice.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Hash everything a reader yields.
    pub fn of_reader(reader: &mut impl Read) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(hasher.finalize().into()))
    }

    /// Hash the contents of a file.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let mut file = File::open(path)?;
        Self::of_reader(&mut file)
    }

    /// Parse from a lowercase or uppercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, ParseHashError> {
        let bytes = hex::decode(s).map_err(|_| ParseHashError::InvalidHex(s.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseHashError::WrongLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 8 hex characters, for log lines and directory names.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_of_bytes_known_vector() {
        // SHA-256 of "hello world"
        let hash = ContentHash::of_bytes(b"hello world");
        assert_eq!(
            hash.to_string(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_of_file_matches_of_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.bin");

        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello world").unwrap();

        let from_file = ContentHash::of_file(&path).unwrap();
        let from_bytes = ContentHash::of_bytes(b"hello world");
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn test_of_file_larger_than_buffer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.bin");

        let data = vec![0xABu8; 100_000];
        std::fs::write(&path, &data).unwrap();

        assert_eq!(
            ContentHash::of_file(&path).unwrap(),
            ContentHash::of_bytes(&data)
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = ContentHash::of_bytes(b"round trip");
        let parsed = ContentHash::from_hex(&hash.to_string()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(matches!(
            ContentHash::from_hex("not hex at all"),
            Err(ParseHashError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert_eq!(
            ContentHash::from_hex("abcdef"),
            Err(ParseHashError::WrongLength(3))
        );
    }

    #[test]
    fn test_short_prefix() {
        let hash = ContentHash::of_bytes(b"hello world");
        assert_eq!(hash.short(), "b94d27b9");
        assert!(hash.to_string().starts_with(&hash.short()));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash = ContentHash::of_bytes(b"serde");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash));

        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
