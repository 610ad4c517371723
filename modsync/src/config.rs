//! Synchronization configuration.
//!
//! `SyncConfig` collects the few knobs a reconciliation attempt needs. The
//! defaults put the staging area under the platform cache directory and the
//! enabled-set file under the platform config directory, so an embedding
//! client works with no configuration at all.

use std::path::PathBuf;

/// Configuration for a reconciliation attempt.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory downloads are staged and unpacked in.
    ///
    /// Wiped at the start of every attempt; artifacts from a failed attempt
    /// stay around until then for inspection.
    pub staging_dir: PathBuf,

    /// Where the committed enabled set is persisted.
    pub enabled_path: PathBuf,

    /// Name of the client's base package, when the embedding client has one.
    ///
    /// The base install can never be fetched over a mod transfer, so a host
    /// declaring a different build of it fails the attempt up front.
    pub base_package: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let cache = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            staging_dir: cache.join("modsync").join("downloads"),
            enabled_path: config.join("modsync").join("enabled.json"),
            base_package: None,
        }
    }
}

impl SyncConfig {
    /// Set the staging directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Set the enabled-set file path.
    pub fn with_enabled_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.enabled_path = path.into();
        self
    }

    /// Set the base package name.
    pub fn with_base_package(mut self, name: impl Into<String>) -> Self {
        self.base_package = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_are_namespaced() {
        let config = SyncConfig::default();
        assert!(config.staging_dir.to_string_lossy().contains("modsync"));
        assert!(config.enabled_path.to_string_lossy().contains("modsync"));
        assert!(config.base_package.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = SyncConfig::default()
            .with_staging_dir("/tmp/staging")
            .with_enabled_path("/tmp/enabled.json")
            .with_base_package("Vanilla");

        assert_eq!(config.staging_dir, PathBuf::from("/tmp/staging"));
        assert_eq!(config.enabled_path, PathBuf::from("/tmp/enabled.json"));
        assert_eq!(config.base_package.as_deref(), Some("Vanilla"));
    }
}
