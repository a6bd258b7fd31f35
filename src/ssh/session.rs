//! Verified SFTP delivery session
//!
//! A [`DeliverySession`] owns one authenticated SSH connection and the SFTP
//! channel opened on top of it. The lifecycle is explicit:
//! `Closed --connect()--> Open --close()--> Closed`, and a closed session may
//! reconnect. Transfer operations require an open channel and fail with
//! [`CourierError::NotConnected`] otherwise, without side effects.
//!
//! Sessions are plain values: construct one per delivery target, as many as
//! needed. Methods take `&mut self`, so operations on one session are
//! serialized by the borrow checker; there is no internal locking.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{HostConfig, LimitsConfig};
use crate::digest::{self, DigestAlgorithm};
use crate::error::{CourierError, Result};

use super::client::SshClient;
use super::sftp::{SftpClient, TransferProgress, TransferResult};

/// The open half of a session: an SSH transport plus its SFTP channel,
/// created together and released together.
struct Transport {
    client: SshClient,
    sftp: SftpClient,
}

/// An authenticated SFTP delivery session for a single remote host.
pub struct DeliverySession {
    config: HostConfig,
    limits: LimitsConfig,
    transport: Option<Transport>,
}

impl DeliverySession {
    /// Create a closed session for the given target with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::ConfigInvalid`] if the configuration fails
    /// validation; no session state is constructed in that case.
    pub fn new(config: HostConfig) -> Result<Self> {
        Self::with_limits(config, LimitsConfig::default())
    }

    /// Create a closed session with explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::ConfigInvalid`] if the configuration fails
    /// validation.
    pub fn with_limits(config: HostConfig, limits: LimitsConfig) -> Result<Self> {
        config.validate("session")?;
        Ok(Self {
            config,
            limits,
            transport: None,
        })
    }

    /// Whether the session currently holds an open connection and channel.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// The target this session delivers to.
    #[must_use]
    pub const fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Establish the SSH transport and open the SFTP channel on top of it.
    ///
    /// Calling `connect` on an already-open session is a no-op that keeps
    /// the existing transport; a second connection is never opened. To force
    /// a reconnect, call [`close`](Self::close) first.
    ///
    /// # Errors
    ///
    /// - [`CourierError::KeyLoad`] if a configured private key cannot be
    ///   loaded
    /// - [`CourierError::Connection`] if the handshake fails
    /// - [`CourierError::AuthFailed`] if the credentials are rejected
    /// - [`CourierError::Sftp`] if the SFTP channel cannot be opened
    ///
    /// On any error the session remains closed: a connection that was
    /// established before a later step failed is released before returning.
    pub async fn connect(&mut self) -> Result<()> {
        if self.transport.is_some() {
            debug!(host = %self.config.hostname, "Session already open, reusing connection");
            return Ok(());
        }

        let client = SshClient::connect(&self.config, &self.limits).await?;

        let sftp = match client.sftp_channel().await {
            Ok(sftp) => sftp,
            Err(e) => {
                // Don't leak the transport when channel setup fails
                if let Err(close_err) = client.close().await {
                    warn!(error = %close_err, "Failed to release connection after channel error");
                }
                return Err(e);
            }
        };

        info!(
            host = %self.config.hostname,
            port = self.config.port,
            user = %self.config.user,
            "SFTP session established"
        );

        self.transport = Some(Transport { client, sftp });
        Ok(())
    }

    /// Release the SFTP channel and the SSH transport, in that order.
    ///
    /// Idempotent: closing a session that is already closed, or was never
    /// connected, does nothing. Teardown failures are logged, not surfaced,
    /// since the caller can do nothing useful with them.
    pub async fn close(&mut self) {
        if let Some(Transport { client, sftp }) = self.transport.take() {
            if let Err(e) = sftp.close().await {
                warn!(host = %self.config.hostname, error = %e, "Failed to close SFTP channel");
            }
            if let Err(e) = client.close().await {
                warn!(host = %self.config.hostname, error = %e, "Failed to close SSH transport");
            }
            debug!(host = %self.config.hostname, "Session closed");
        }
    }

    fn transport(&self) -> Result<&Transport> {
        self.transport.as_ref().ok_or(CourierError::NotConnected)
    }

    /// Upload a local file to the remote path, overwriting if present.
    ///
    /// # Errors
    ///
    /// [`CourierError::NotConnected`] if the session is closed;
    /// [`CourierError::LocalRead`] / [`CourierError::RemoteWrite`] on
    /// transfer failures.
    pub async fn upload(&mut self, local_path: &Path, remote_path: &str) -> Result<TransferResult> {
        self.upload_with::<fn(TransferProgress)>(local_path, remote_path, None)
            .await
    }

    /// [`upload`](Self::upload) with an optional progress callback.
    ///
    /// # Errors
    ///
    /// See [`upload`](Self::upload).
    pub async fn upload_with<F>(
        &mut self,
        local_path: &Path,
        remote_path: &str,
        progress_callback: Option<F>,
    ) -> Result<TransferResult>
    where
        F: FnMut(TransferProgress),
    {
        let transport = self.transport()?;
        debug!(
            host = %self.config.hostname,
            local = %local_path.display(),
            remote = %remote_path,
            "Uploading file"
        );
        transport
            .sftp
            .upload_file(local_path, remote_path, self.limits.chunk_size, progress_callback)
            .await
    }

    /// Download a remote file to the local path, overwriting if present.
    ///
    /// # Errors
    ///
    /// [`CourierError::NotConnected`] if the session is closed;
    /// [`CourierError::RemoteRead`] / [`CourierError::LocalWrite`] on
    /// transfer failures.
    pub async fn download(
        &mut self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<TransferResult> {
        self.download_with::<fn(TransferProgress)>(remote_path, local_path, None)
            .await
    }

    /// [`download`](Self::download) with an optional progress callback.
    ///
    /// # Errors
    ///
    /// See [`download`](Self::download).
    pub async fn download_with<F>(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        progress_callback: Option<F>,
    ) -> Result<TransferResult>
    where
        F: FnMut(TransferProgress),
    {
        let transport = self.transport()?;
        debug!(
            host = %self.config.hostname,
            remote = %remote_path,
            local = %local_path.display(),
            "Downloading file"
        );
        transport
            .sftp
            .download_file(remote_path, local_path, self.limits.chunk_size, progress_callback)
            .await
    }

    /// Compute the digest of a remote file by streaming it through the
    /// channel.
    ///
    /// # Errors
    ///
    /// [`CourierError::NotConnected`] if the session is closed;
    /// [`CourierError::RemoteRead`] if the remote file cannot be opened or
    /// read.
    pub async fn remote_digest(
        &mut self,
        remote_path: &str,
        algorithm: DigestAlgorithm,
    ) -> Result<String> {
        let transport = self.transport()?;
        let reader = transport.sftp.open_remote_reader(remote_path).await?;
        digest::compute_digest(reader, algorithm)
            .await
            .map_err(|e| match e {
                CourierError::Io(io) => CourierError::RemoteRead {
                    path: remote_path.to_string(),
                    reason: io.to_string(),
                },
                other => other,
            })
    }

    /// Upload a file and verify the delivery by comparing digests of the
    /// local source and the just-uploaded remote copy.
    ///
    /// Returns `true` iff the two hex digests are byte-equal. Not
    /// transactional: on mismatch the remote file is left as uploaded, and
    /// the caller decides whether to retry or delete.
    ///
    /// # Errors
    ///
    /// [`CourierError::NotConnected`] if the session is closed, plus any
    /// error [`upload`](Self::upload) or the digest computations can raise.
    pub async fn verified_upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
        algorithm: DigestAlgorithm,
    ) -> Result<bool> {
        self.verified_upload_with::<fn(TransferProgress)>(local_path, remote_path, algorithm, None)
            .await
    }

    /// [`verified_upload`](Self::verified_upload) with an optional progress
    /// callback for the upload phase.
    ///
    /// # Errors
    ///
    /// See [`verified_upload`](Self::verified_upload).
    pub async fn verified_upload_with<F>(
        &mut self,
        local_path: &Path,
        remote_path: &str,
        algorithm: DigestAlgorithm,
        progress_callback: Option<F>,
    ) -> Result<bool>
    where
        F: FnMut(TransferProgress),
    {
        self.upload_with(local_path, remote_path, progress_callback)
            .await?;

        let local_hex = digest::file_digest(local_path, algorithm).await?;
        let remote_hex = self.remote_digest(remote_path, algorithm).await?;

        let verified = local_hex == remote_hex;
        if verified {
            info!(
                host = %self.config.hostname,
                remote = %remote_path,
                algorithm = %algorithm,
                "Upload verified"
            );
        } else {
            warn!(
                host = %self.config.hostname,
                remote = %remote_path,
                algorithm = %algorithm,
                "Digest mismatch after upload; remote copy left in place"
            );
        }

        Ok(verified)
    }
}

impl fmt::Display for DeliverySession {
    /// Diagnostic form: target and state only, never credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.config,
            if self.is_connected() { "open" } else { "closed" }
        )
    }
}

impl fmt::Debug for DeliverySession {
    /// Debug form delegates to [`Display`]: target and state only, never
    /// credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeliverySession({self})")
    }
}
