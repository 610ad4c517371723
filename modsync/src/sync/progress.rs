//! Attempt-level progress shared with the UI.
//!
//! The reconciler writes, pollers read; everything is atomics plus one small
//! mutex for the current package name, so a UI can poll at frame rate
//! without touching the reconciler.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::transfer::TransferProgress;

/// Progress of one reconciliation attempt.
#[derive(Debug, Default)]
pub struct SyncProgress {
    current: Mutex<Option<(String, Arc<TransferProgress>)>>,
    completed: AtomicUsize,
    total: AtomicUsize,
    bytes_downloaded: AtomicU64,
    finished: AtomicBool,
}

impl SyncProgress {
    /// Create an idle progress handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the package currently transferring, if any.
    pub fn current_package(&self) -> Option<String> {
        self.current.lock().as_ref().map(|(name, _)| name.clone())
    }

    /// `(received, total)` bytes of the current transfer; zeros when idle.
    pub fn current_bytes(&self) -> (u64, u64) {
        self.current
            .lock()
            .as_ref()
            .map(|(_, progress)| progress.get())
            .unwrap_or((0, 0))
    }

    /// Packages fully downloaded and verified so far.
    pub fn completed_packages(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Packages queued for download this attempt.
    pub fn total_packages(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Total bytes of completed downloads.
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::SeqCst)
    }

    /// Whether the attempt has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn set_total_packages(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub(crate) fn start_package(&self, name: &str, transfer: Arc<TransferProgress>) {
        *self.current.lock() = Some((name.to_string(), transfer));
    }

    pub(crate) fn finish_package(&self, bytes: u64) {
        *self.current.lock() = None;
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.bytes_downloaded.fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        *self.current.lock() = None;
        self.finished.store(true, Ordering::SeqCst);
    }
}
