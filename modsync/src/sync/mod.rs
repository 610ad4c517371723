//! Package-set reconciliation against a multiplayer host.
//!
//! This module contains everything that happens between "the host told us
//! what it runs" and "the client runs the same thing":
//!
//! - Pure hash matching of host descriptors against local packages (`matcher`)
//! - A FIFO backlog of missing packages (`queue`)
//! - The one-at-a-time transfer session over a pluggable transport
//!   (`transfer`, `transport`)
//! - Artifact verification behind a decompression seam (`verifier`,
//!   `extractor`)
//! - The process-wide enabled configuration with backup/rollback (`enabled`)
//! - The [`Reconciler`] state machine tying it together (`reconciler`)
//!
//! # Failure policy
//!
//! Every failure aborts the whole attempt; nothing is retried inside one
//! attempt, and no partial package is ever registered as usable. The commit
//! step is the single place with compensating rollback instead of a plain
//! unwind, because it mutates durable shared state.

mod enabled;
mod error;
mod extractor;
mod matcher;
mod progress;
mod queue;
mod reconciler;
mod transfer;
mod transport;
mod verifier;

pub use enabled::{EnabledPackages, EnabledSet, StoreError};
pub use error::{ProtocolViolation, SyncError, SyncResult};
pub use extractor::{ArchiveExtractor, ExtractError, ShellExtractor};
pub use matcher::{match_by_hash, missing_of, PackageMatch};
pub use progress::SyncProgress;
pub use queue::DownloadQueue;
pub use reconciler::{
    AutoConfirm, BoxFuture, Reconciler, SyncConfirmer, SyncOutcome, SyncReport, SyncState,
};
pub use transfer::{
    PendingTransfer, TransferError, TransferFeed, TransferProgress, TransferSession, Transport,
};
pub use transport::{DirTransport, HttpTransport};
pub use verifier::ArtifactVerifier;
