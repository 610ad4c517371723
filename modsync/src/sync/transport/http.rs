//! HTTP-backed transfer transport.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::package::{archive_filename, ContentHash};

use super::super::error::{SyncError, SyncResult};
use super::super::transfer::{PendingTransfer, TransferError, TransferProgress, Transport};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Transport that streams package archives over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport fetching archives under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn archive_url(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), filename)
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        name: &str,
        _expected: &ContentHash,
        dest_dir: &Path,
    ) -> SyncResult<PendingTransfer> {
        let filename = archive_filename(name).ok_or_else(|| SyncError::TransferRequest {
            name: name.to_string(),
            reason: "package name yields no usable archive filename".to_string(),
        })?;

        let url = self.archive_url(&filename);
        let dest = dest_dir.join(&filename);
        let client = self.client.clone();

        let (feed, pending) = PendingTransfer::channel();
        thread::spawn(move || {
            let result = stream_download(&client, &url, &dest, feed.progress());
            feed.complete(result);
        });

        Ok(pending)
    }
}

/// Stream the response body to the destination file, reporting progress.
fn stream_download(
    client: &Client,
    url: &str,
    dest: &Path,
    progress: &TransferProgress,
) -> Result<PathBuf, TransferError> {
    let mut response = client.get(url).send().map_err(|e| {
        if e.is_timeout() {
            TransferError::TimedOut
        } else {
            TransferError::Network(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::Rejected(format!(
            "GET {} returned status {}",
            url, status
        )));
    }

    if let Some(total) = response.content_length() {
        progress.set_total(total);
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| TransferError::Network(format!("cannot stage download: {}", e)))?;
    }
    let file = File::create(dest)
        .map_err(|e| TransferError::Network(format!("cannot stage download: {}", e)))?;

    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut received = 0u64;

    loop {
        let bytes_read = response.read(&mut buffer).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                TransferError::TimedOut
            } else {
                TransferError::Network(format!("read error: {}", e))
            }
        })?;
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
