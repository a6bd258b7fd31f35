//! Streaming SFTP file transfers.
//!
//! Uploads and downloads copy bytes through a fixed-size buffer, so memory
//! use is bounded by the chunk size regardless of file size. Transfers
//! overwrite the destination if it exists.

use std::path::Path;
use std::time::Instant;

use russh_sftp::client::SftpSession;
use russh_sftp::client::fs::File as RemoteFile;
use russh_sftp::protocol::OpenFlags;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use crate::error::{CourierError, Result};

/// Default chunk size for streaming transfers (1 MB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Validate that a path doesn't contain path traversal components.
fn validate_remote_path(path: &str) -> Result<()> {
    if path.split('/').any(|component| component == "..") {
        return Err(CourierError::Sftp {
            reason: "Path traversal ('..') is not allowed in remote paths".to_string(),
        });
    }
    Ok(())
}

/// Progress information during transfer
#[derive(Debug, Clone, Copy)]
pub struct TransferProgress {
    /// Bytes transferred so far
    pub bytes_transferred: u64,
    /// Total bytes to transfer
    pub total_bytes: u64,
    /// Progress percentage (0.0 - 100.0)
    pub percentage: f64,
}

impl TransferProgress {
    #[expect(clippy::cast_precision_loss)]
    fn new(bytes_transferred: u64, total_bytes: u64) -> Self {
        Self {
            bytes_transferred,
            total_bytes,
            percentage: if total_bytes > 0 {
                (bytes_transferred as f64 / total_bytes as f64) * 100.0
            } else {
                100.0
            },
        }
    }
}

/// Result of a file transfer
#[derive(Debug, Clone)]
pub struct TransferResult {
    /// Total bytes transferred
    pub bytes_transferred: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Transfer rate in bytes per second
    pub bytes_per_second: f64,
}

impl TransferResult {
    #[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn new(bytes_transferred: u64, start: Instant) -> Self {
        let duration_ms = start.elapsed().as_millis() as u64;
        let bytes_per_second = if duration_ms > 0 {
            (bytes_transferred as f64 / duration_ms as f64) * 1000.0
        } else {
            0.0
        };
        Self {
            bytes_transferred,
            duration_ms,
            bytes_per_second,
        }
    }
}

/// SFTP client wrapper for file transfers
pub struct SftpClient {
    session: SftpSession,
}

impl SftpClient {
    pub(crate) fn new(session: SftpSession) -> Self {
        Self { session }
    }

    /// Upload a file to the remote host, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// - [`CourierError::LocalRead`] if the local file cannot be opened or read
    /// - [`CourierError::RemoteWrite`] if the remote path cannot be created
    ///   or written (permissions, missing parent directory, disk full)
    pub async fn upload_file<F>(
        &self,
        local_path: &Path,
        remote_path: &str,
        chunk_size: usize,
        mut progress_callback: Option<F>,
    ) -> Result<TransferResult>
    where
        F: FnMut(TransferProgress),
    {
        let start = Instant::now();
        validate_remote_path(remote_path)?;

        let local_file = File::open(local_path)
            .await
            .map_err(|e| local_read(local_path, &e))?;

        let metadata = local_file
            .metadata()
            .await
            .map_err(|e| local_read(local_path, &e))?;
        let file_size = metadata.len();

        let mut remote_file = self
            .session
            .open_with_flags(
                remote_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| remote_write(remote_path, &e))?;

        let mut reader = BufReader::with_capacity(chunk_size, local_file);
        let mut buffer = vec![0u8; chunk_size];
        let mut total_written = 0u64;

        loop {
            let n = reader
                .read(&mut buffer)
                .await
                .map_err(|e| local_read(local_path, &e))?;

            if n == 0 {
                break;
            }

            remote_file
                .write_all(&buffer[..n])
                .await
                .map_err(|e| remote_write(remote_path, &e))?;

            total_written += n as u64;

            if let Some(ref mut callback) = progress_callback {
                callback(TransferProgress::new(total_written, file_size));
            }
        }

        remote_file
            .flush()
            .await
            .map_err(|e| remote_write(remote_path, &e))?;

        // Close the remote handle properly so the server commits the write
        remote_file
            .shutdown()
            .await
            .map_err(|e| remote_write(remote_path, &e))?;

        Ok(TransferResult::new(total_written, start))
    }

    /// Download a file from the remote host, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// - [`CourierError::RemoteRead`] if the remote file cannot be opened
    ///   or read
    /// - [`CourierError::LocalWrite`] if the local file cannot be created
    ///   or written
    pub async fn download_file<F>(
        &self,
        remote_path: &str,
        local_path: &Path,
        chunk_size: usize,
        mut progress_callback: Option<F>,
    ) -> Result<TransferResult>
    where
        F: FnMut(TransferProgress),
    {
        let start = Instant::now();
        validate_remote_path(remote_path)?;

        let remote_metadata = self
            .session
            .metadata(remote_path)
            .await
            .map_err(|e| remote_read(remote_path, &e))?;
        let file_size = remote_metadata.size.unwrap_or(0);

        let mut remote_file = self
            .session
            .open(remote_path)
            .await
            .map_err(|e| remote_read(remote_path, &e))?;

        let local_file = File::create(local_path)
            .await
            .map_err(|e| local_write(local_path, &e))?;

        let mut writer = BufWriter::with_capacity(chunk_size, local_file);
        let mut buffer = vec![0u8; chunk_size];
        let mut total_read = 0u64;

        loop {
            let n = remote_file
                .read(&mut buffer)
                .await
                .map_err(|e| remote_read(remote_path, &e))?;

            if n == 0 {
                break;
            }

            writer
                .write_all(&buffer[..n])
                .await
                .map_err(|e| local_write(local_path, &e))?;

            total_read += n as u64;

            if let Some(ref mut callback) = progress_callback {
                callback(TransferProgress::new(total_read, file_size));
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| local_write(local_path, &e))?;

        Ok(TransferResult::new(total_read, start))
    }

    /// Open a remote file for reading, for digest verification of an
    /// uploaded copy.
    pub(crate) async fn open_remote_reader(&self, remote_path: &str) -> Result<RemoteFile> {
        validate_remote_path(remote_path)?;
        self.session
            .open(remote_path)
            .await
            .map_err(|e| remote_read(remote_path, &e))
    }

    /// Close the SFTP session
    ///
    /// # Errors
    ///
    /// Returns an error if the SFTP session cannot be closed cleanly.
    pub async fn close(self) -> Result<()> {
        self.session.close().await.map_err(|e| CourierError::Sftp {
            reason: e.to_string(),
        })
    }
}

fn local_read(path: &Path, e: &impl std::fmt::Display) -> CourierError {
    CourierError::LocalRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn local_write(path: &Path, e: &impl std::fmt::Display) -> CourierError {
    CourierError::LocalWrite {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn remote_read(path: &str, e: &impl std::fmt::Display) -> CourierError {
    CourierError::RemoteRead {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

fn remote_write(path: &str, e: &impl std::fmt::Display) -> CourierError {
    CourierError::RemoteWrite {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_remote_path_rejects_traversal() {
        assert!(validate_remote_path("/incoming/../etc/passwd").is_err());
        assert!(validate_remote_path("../../../etc/shadow").is_err());
        assert!(validate_remote_path("/tmp/foo/../../etc").is_err());
    }

    #[test]
    fn test_validate_remote_path_accepts_valid() {
        assert!(validate_remote_path("/incoming/report.pdf").is_ok());
        assert!(validate_remote_path("relative/path/file").is_ok());
        assert!(validate_remote_path("/path/with...dots").is_ok());
    }

    #[test]
    fn test_transfer_progress_percentage() {
        let progress = TransferProgress::new(500, 1000);
        assert!((progress.percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_transfer_progress_empty_file_is_complete() {
        let progress = TransferProgress::new(0, 0);
        assert!((progress.percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_transfer_result_zero_duration_rate() {
        // An Instant::now() start gives a 0ms duration; the rate must not
        // divide by zero
        let result = TransferResult::new(100, Instant::now());
        assert_eq!(result.bytes_transferred, 100);
        assert!(result.bytes_per_second >= 0.0);
    }

    #[test]
    fn test_default_chunk_size() {
        assert_eq!(DEFAULT_CHUNK_SIZE, 1024 * 1024);
        assert!(DEFAULT_CHUNK_SIZE.is_power_of_two());
    }
}
