use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Config, Handle, Handler};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::{PrivateKey, PublicKey, load_secret_key};
use russh_sftp::client::SftpSession;
use tokio::time::timeout;

use crate::config::{AuthConfig, HostConfig, LimitsConfig};
use crate::error::{CourierError, Result};
use crate::ssh::sftp::SftpClient;

/// Sanitize SSH error messages to prevent credential leakage.
/// Removes authentication method names that could aid reconnaissance and
/// truncates overly long messages that might contain data dumps.
fn sanitize_ssh_error(error: &impl std::fmt::Display) -> String {
    let mut msg = error.to_string();
    for method in &["publickey", "keyboard-interactive", "gssapi-with-mic"] {
        msg = msg.replace(method, "***");
    }
    if msg.len() > 500 {
        format!("{}... (truncated)", &msg[..500])
    } else {
        msg
    }
}

/// Handler that accepts whatever host key the server presents.
///
/// Delivery targets are provisioned dynamically and their keys are not
/// distributed out of band, so the session trusts the first key it sees.
/// This matches `ssh -o StrictHostKeyChecking=no` semantics: it protects
/// against passive eavesdropping but NOT against an active man-in-the-middle
/// on first contact. Callers who need strict verification should front the
/// target with a bastion they already trust.
struct AcceptAllHostKeys {
    hostname: String,
}

impl Handler for AcceptAllHostKeys {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        tracing::debug!(host = %self.hostname, "Accepting server host key");
        Ok(true)
    }
}

/// SSH client wrapper: one encrypted transport to one delivery target.
pub struct SshClient {
    handle: Handle<AcceptAllHostKeys>,
    hostname: String,
}

impl SshClient {
    /// Connect and authenticate using the configured credential mode.
    ///
    /// Key material is loaded and parsed before the network is touched, so a
    /// bad key path fails fast without a dial attempt.
    ///
    /// # Errors
    ///
    /// - [`CourierError::KeyLoad`] if a configured private key is missing,
    ///   unreadable, or malformed
    /// - [`CourierError::Connection`] if the TCP/SSH handshake cannot
    ///   complete within the configured timeout
    /// - [`CourierError::AuthFailed`] if the server rejects the credentials
    #[must_use = "the SSH client must be used or closed"]
    pub async fn connect(host: &HostConfig, limits: &LimitsConfig) -> Result<Self> {
        match &host.auth {
            AuthConfig::Key { path, passphrase } => {
                let key_pair = Self::load_key(path, passphrase.as_ref().map(|s| s.as_str()))?;
                let handle = Self::establish_connection(host, limits).await?;
                Self::auth_with_key(handle, host, key_pair).await
            }
            AuthConfig::Password { password } => {
                let handle = Self::establish_connection(host, limits).await?;
                Self::auth_with_password(handle, host, password).await
            }
        }
    }

    /// Load a private key from disk, expanding `~` in the path
    fn load_key(path: &str, passphrase: Option<&str>) -> Result<PrivateKey> {
        let expanded = shellexpand::tilde(path);
        let key_path = Path::new(expanded.as_ref());

        if !key_path.exists() {
            return Err(CourierError::KeyLoad {
                path: path.to_string(),
                reason: "file not found".to_string(),
            });
        }

        load_secret_key(key_path, passphrase).map_err(|e| CourierError::KeyLoad {
            path: path.to_string(),
            reason: sanitize_ssh_error(&e),
        })
    }

    /// Establish the TCP/SSH connection
    async fn establish_connection(
        host: &HostConfig,
        limits: &LimitsConfig,
    ) -> Result<Handle<AcceptAllHostKeys>> {
        let config = Config {
            inactivity_timeout: Some(Duration::from_secs(limits.keepalive_interval_seconds)),
            keepalive_interval: Some(Duration::from_secs(limits.keepalive_interval_seconds)),
            keepalive_max: 3,
            ..Default::default()
        };
        let config = Arc::new(config);

        let handler = AcceptAllHostKeys {
            hostname: host.hostname.clone(),
        };

        let addr = format!("{}:{}", host.hostname, host.port);
        let connect_timeout = Duration::from_secs(limits.connection_timeout_seconds);
        let timeout_secs = limits.connection_timeout_seconds;

        timeout(connect_timeout, client::connect(config, &addr, handler))
            .await
            .map_err(|_| {
                tracing::error!(host = %host.hostname, addr = %addr, timeout_secs, "SSH connection timeout");
                CourierError::Connection {
                    host: host.hostname.clone(),
                    reason: format!("Connection timeout after {timeout_secs}s"),
                }
            })?
            .map_err(|e| {
                tracing::error!(host = %host.hostname, addr = %addr, error = %e, "SSH connection failed");
                CourierError::Connection {
                    host: host.hostname.clone(),
                    reason: e.to_string(),
                }
            })
    }

    /// Authenticate using a private key
    async fn auth_with_key(
        mut handle: Handle<AcceptAllHostKeys>,
        host: &HostConfig,
        key_pair: PrivateKey,
    ) -> Result<Self> {
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();

        let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg);

        let auth_result = handle
            .authenticate_publickey(&host.user, key_with_hash)
            .await
            .map_err(|e| {
                tracing::error!(host = %host.hostname, user = %host.user, error = %sanitize_ssh_error(&e), method = "key", "SSH key authentication error");
                CourierError::AuthFailed {
                    user: host.user.clone(),
                    host: host.hostname.clone(),
                }
            })?;

        if !auth_result.success() {
            tracing::error!(host = %host.hostname, user = %host.user, method = "key", "SSH key authentication failed");
            return Err(CourierError::AuthFailed {
                user: host.user.clone(),
                host: host.hostname.clone(),
            });
        }

        Ok(Self {
            handle,
            hostname: host.hostname.clone(),
        })
    }

    /// Authenticate using a password
    async fn auth_with_password(
        mut handle: Handle<AcceptAllHostKeys>,
        host: &HostConfig,
        password: &str,
    ) -> Result<Self> {
        let auth_result = handle
            .authenticate_password(&host.user, password)
            .await
            .map_err(|e| {
                tracing::error!(host = %host.hostname, user = %host.user, error = %sanitize_ssh_error(&e), method = "password", "SSH password authentication error");
                CourierError::AuthFailed {
                    user: host.user.clone(),
                    host: host.hostname.clone(),
                }
            })?;

        if !auth_result.success() {
            tracing::error!(host = %host.hostname, user = %host.user, method = "password", "SSH password authentication failed");
            return Err(CourierError::AuthFailed {
                user: host.user.clone(),
                host: host.hostname.clone(),
            });
        }

        Ok(Self {
            handle,
            hostname: host.hostname.clone(),
        })
    }

    /// Open an SFTP channel on this connection
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Sftp`] if the channel cannot be opened, the
    /// `sftp` subsystem request fails, or SFTP initialization fails.
    pub async fn sftp_channel(&self) -> Result<SftpClient> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| CourierError::Sftp {
                reason: format!("Failed to open channel: {e}"),
            })?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| CourierError::Sftp {
                reason: format!("Failed to request SFTP subsystem: {e}"),
            })?;

        let sftp_session =
            SftpSession::new(channel.into_stream())
                .await
                .map_err(|e| CourierError::Sftp {
                    reason: format!("Failed to initialize SFTP session: {e}"),
                })?;

        Ok(SftpClient::new(sftp_session))
    }

    /// Get the target hostname
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Close the connection (with 5s timeout to avoid blocking)
    ///
    /// # Errors
    ///
    /// Returns an error if the disconnect message cannot be sent to the
    /// server. A timeout is not an error: the connection was likely dead.
    pub async fn close(self) -> Result<()> {
        match timeout(
            Duration::from_secs(5),
            self.handle
                .disconnect(russh::Disconnect::ByApplication, "", "en"),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CourierError::Connection {
                host: self.hostname,
                reason: e.to_string(),
            }),
            Err(_) => {
                tracing::warn!(host = %self.hostname, "Timeout closing SSH connection, forcing drop");
                Ok(())
            }
        }
    }
}
