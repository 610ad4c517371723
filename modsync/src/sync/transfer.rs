//! The transport seam and the single in-flight transfer session.
//!
//! A [`Transport`] is the narrow contract the reconciler consumes: request a
//! package by name and expected hash, observe byte progress without blocking,
//! and await a completion carrying either the artifact path or a failure.
//! The wire protocol behind that contract is entirely the transport's
//! business.
//!
//! At most one [`TransferSession`] is driven at a time; the reconciler
//! serializes downloads by construction.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::package::{ContentHash, ServerPackage};

use super::error::{SyncError, SyncResult};

/// Failures a transport can report for an in-flight transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Network fault while transferring.
    #[error("network error: {0}")]
    Network(String),

    /// The peer went away before the transfer finished.
    #[error("peer disconnected")]
    Disconnected,

    /// The transport's deadline elapsed.
    #[error("transfer timed out")]
    TimedOut,

    /// The peer refused to serve the requested package.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Byte counters for one transfer, written by the transport and read
/// lock-free by progress pollers.
#[derive(Debug, Default)]
pub struct TransferProgress {
    received: AtomicU64,
    total: AtomicU64,
}

impl TransferProgress {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the expected total size, once known.
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    /// Record the bytes received so far.
    pub fn set_received(&self, received: u64) {
        self.received.store(received, Ordering::SeqCst);
    }

    /// Read `(received, total)`. Total is 0 until the transport learns it.
    pub fn get(&self) -> (u64, u64) {
        (
            self.received.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }
}

/// Transport-side handle for one transfer: progress counters to update and
/// the completion to deliver.
#[derive(Debug)]
pub struct TransferFeed {
    progress: Arc<TransferProgress>,
    done: oneshot::Sender<Result<PathBuf, TransferError>>,
}

impl TransferFeed {
    /// The counters this transfer reports through.
    pub fn progress(&self) -> &TransferProgress {
        &self.progress
    }

    /// Deliver the completion. Consumes the feed; a feed dropped without
    /// completing is observed as a disconnect.
    pub fn complete(self, result: Result<PathBuf, TransferError>) {
        let _ = self.done.send(result);
    }
}

/// Caller-side handle returned by [`Transport::request`].
#[derive(Debug)]
pub struct PendingTransfer {
    progress: Arc<TransferProgress>,
    done: oneshot::Receiver<Result<PathBuf, TransferError>>,
}

impl PendingTransfer {
    /// Create a linked feed/pending pair for a new transfer.
    pub fn channel() -> (TransferFeed, PendingTransfer) {
        let progress = Arc::new(TransferProgress::new());
        let (tx, rx) = oneshot::channel();
        (
            TransferFeed {
                progress: Arc::clone(&progress),
                done: tx,
            },
            PendingTransfer { progress, done: rx },
        )
    }
}

/// External transfer transport.
///
/// `request` fails only when the transport itself cannot be reached; problems
/// with the transfer itself (missing file, network fault, timeout) are
/// delivered through the pending transfer's completion.
pub trait Transport: Send + Sync {
    /// Start fetching `name` into `dest_dir`.
    fn request(
        &self,
        name: &str,
        expected: &ContentHash,
        dest_dir: &Path,
    ) -> SyncResult<PendingTransfer>;
}

/// One in-flight download.
///
/// Exists only while a transfer is active. Dropping the session releases the
/// caller's interest in the transfer; the transport observes the closed
/// completion channel and abandons its work.
#[derive(Debug)]
pub struct TransferSession {
    target: ServerPackage,
    progress: Arc<TransferProgress>,
    done: oneshot::Receiver<Result<PathBuf, TransferError>>,
}

impl TransferSession {
    /// Request a transfer for `target` from the transport.
    pub fn begin(
        transport: &dyn Transport,
        target: ServerPackage,
        dest_dir: &Path,
    ) -> SyncResult<Self> {
        let pending = transport.request(&target.name, &target.hash, dest_dir)?;
        Ok(Self {
            target,
            progress: pending.progress,
            done: pending.done,
        })
    }

    /// The descriptor being fetched.
    pub fn target(&self) -> &ServerPackage {
        &self.target
    }

    /// Non-blocking `(received, total)` poll.
    pub fn progress(&self) -> (u64, u64) {
        self.progress.get()
    }

    /// Shared counters, for wiring into attempt-level progress.
    pub fn progress_handle(&self) -> Arc<TransferProgress> {
        Arc::clone(&self.progress)
    }

    /// Suspend until the transport reports completion.
    ///
    /// Returns the local artifact path on success. A transport that drops
    /// its feed without completing is reported as a disconnect.
    pub async fn await_completion(self) -> SyncResult<PathBuf> {
        match self.done.await {
            Ok(Ok(path)) => Ok(path),
            Ok(Err(source)) => Err(SyncError::TransferFailed {
                name: self.target.name,
                source,
            }),
            Err(_) => Err(SyncError::TransferFailed {
                name: self.target.name,
                source: TransferError::Disconnected,
            }),
        }
    }
}
