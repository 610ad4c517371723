//! ModSync - multiplayer content package synchronization
//!
//! This library reconciles a game client's locally installed content packages
//! against the authoritative set declared by a multiplayer host: it matches
//! packages by content hash, downloads whatever is missing through a narrow
//! transport seam, verifies every artifact's integrity, and atomically commits
//! the new enabled-package configuration with a backup for rollback.
//!
//! # Architecture
//!
//! ```text
//! Reconciler (state machine)
//!         │
//!         ├── match_by_hash          server descriptors × local packages
//!         ├── DownloadQueue          FIFO backlog of missing descriptors
//!         ├── TransferSession        one in-flight download at a time
//!         │       └── Transport (trait)
//!         │               ├── DirTransport
//!         │               └── HttpTransport
//!         ├── ArtifactVerifier       extract + manifest load + hash check
//!         │       └── ArchiveExtractor (trait)
//!         └── EnabledPackages        backed-up atomic commit target
//! ```
//!
//! The reconciler runs one attempt as a single async flow; progress is
//! observable from outside through [`sync::SyncProgress`] without blocking.

pub mod config;
pub mod logging;
pub mod package;
pub mod sync;

pub use config::SyncConfig;
pub use sync::{Reconciler, SyncOutcome, SyncReport, SyncState};
