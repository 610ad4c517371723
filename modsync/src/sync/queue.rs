//! FIFO backlog of packages still missing locally.

use std::collections::VecDeque;

use crate::package::{ContentHash, ServerPackage};

/// Ordered backlog of descriptors awaiting download.
///
/// Order is the host's declaration order and is never changed; it determines
/// the user-visible download sequence. Only the reconciler mutates the queue:
/// dequeue on transfer start, [`remove`](Self::remove) when an item resolves
/// out of band.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    pending: VecDeque<ServerPackage>,
}

impl DownloadQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append descriptors, preserving their order.
    pub fn enqueue_all(&mut self, missing: impl IntoIterator<Item = ServerPackage>) {
        self.pending.extend(missing);
    }

    /// Take the next descriptor, front first.
    pub fn dequeue_next(&mut self) -> Option<ServerPackage> {
        self.pending.pop_front()
    }

    /// Drop a descriptor that no longer needs downloading.
    ///
    /// Returns whether anything was removed. Identity is the content hash.
    pub fn remove(&mut self, hash: &ContentHash) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.hash != *hash);
        self.pending.len() != before
    }

    /// Check whether the backlog is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of descriptors still pending.
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
