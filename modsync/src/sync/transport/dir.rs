//! Directory-backed transfer transport.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;

use crate::package::{archive_filename, ContentHash};

use super::super::error::{SyncError, SyncResult};
use super::super::transfer::{PendingTransfer, TransferError, TransferProgress, Transport};

/// Buffer size for copying archives (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Transport that serves package archives out of a directory.
///
/// Covers the host-exported-share case: the host (or a mirror) makes its
/// archives available under one directory, local or network-mounted, and the
/// client copies them into its staging area.
#[derive(Debug, Clone)]
pub struct DirTransport {
    source: PathBuf,
}

impl DirTransport {
    /// Create a transport reading archives from `source`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Transport for DirTransport {
    fn request(
        &self,
        name: &str,
        _expected: &ContentHash,
        dest_dir: &Path,
    ) -> SyncResult<PendingTransfer> {
        if !self.source.is_dir() {
            return Err(SyncError::TransferRequest {
                name: name.to_string(),
                reason: format!("archive directory {} is unreachable", self.source.display()),
            });
        }

        let filename = archive_filename(name).ok_or_else(|| SyncError::TransferRequest {
            name: name.to_string(),
            reason: "package name yields no usable archive filename".to_string(),
        })?;

        let src = self.source.join(&filename);
        let dest = dest_dir.join(&filename);

        let (feed, pending) = PendingTransfer::channel();
        thread::spawn(move || {
            let result = copy_archive(&src, &dest, feed.progress());
            feed.complete(result);
        });

        Ok(pending)
    }
}

/// Copy `src` to `dest` in chunks, reporting progress as bytes land.
fn copy_archive(
    src: &Path,
    dest: &Path,
    progress: &TransferProgress,
) -> Result<PathBuf, TransferError> {
    let mut reader = File::open(src)
        .map_err(|e| TransferError::Network(format!("{} unavailable: {}", src.display(), e)))?;

    let total = reader
        .metadata()
        .map(|m| m.len())
        .map_err(|e| TransferError::Network(e.to_string()))?;
    progress.set_total(total);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| TransferError::Network(format!("cannot stage download: {}", e)))?;
    }
    let mut writer = File::create(dest)
        .map_err(|e| TransferError::Network(format!("cannot stage download: {}", e)))?;

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut received = 0u64;
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| TransferError::Network(e.to_string()))?;
        if bytes_read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| TransferError::Network(e.to_string()))?;
        received += bytes_read as u64;
        progress.set_received(received);
    }
    writer
        .flush()
        .map_err(|e| TransferError::Network(e.to_string()))?;

    Ok(dest.to_path_buf())
}
