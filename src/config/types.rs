use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CourierError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hosts: HashMap<String, HostConfig>,

    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Connection parameters for one delivery target.
///
/// Immutable once validated: [`HostConfig::validate`] runs when a session is
/// constructed and when a config file is loaded, so invalid values never
/// survive to connect time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    pub auth: AuthConfig,

    /// Optional description for this host
    #[serde(default)]
    pub description: Option<String>,
}

impl HostConfig {
    /// Check hostname, port, user and credential shape, naming the offending
    /// field in the error. `field_prefix` scopes the field name (e.g.
    /// `hosts.archive` for config files, `session` for direct construction).
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::ConfigInvalid`] on the first violation found.
    pub fn validate(&self, field_prefix: &str) -> Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(CourierError::ConfigInvalid {
                field: format!("{field_prefix}.hostname"),
                reason: "Hostname cannot be empty".to_string(),
            });
        }

        if self.port == 0 {
            return Err(CourierError::ConfigInvalid {
                field: format!("{field_prefix}.port"),
                reason: "Port must be between 1 and 65535".to_string(),
            });
        }

        if self.user.trim().is_empty() {
            return Err(CourierError::ConfigInvalid {
                field: format!("{field_prefix}.user"),
                reason: "User cannot be empty".to_string(),
            });
        }

        self.auth.validate(field_prefix)
    }
}

impl fmt::Display for HostConfig {
    /// Diagnostic form: host, port, user and the authentication kind.
    /// Never includes the password or key material.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{} (auth: {})",
            self.user,
            self.hostname,
            self.port,
            if self.auth.uses_key() {
                "private key"
            } else {
                "password"
            }
        )
    }
}

const fn default_port() -> u16 {
    22
}

/// SSH authentication configuration.
///
/// Exactly one credential mode per host. The password is wrapped in
/// [`Zeroizing`] so it is erased from memory on drop, and the hand-written
/// `Debug` impl redacts secrets.
#[derive(Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    Key {
        path: String,
        #[serde(default)]
        passphrase: Option<Zeroizing<String>>,
    },
    Password {
        password: Zeroizing<String>,
    },
}

impl AuthConfig {
    /// Password credential.
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password {
            password: Zeroizing::new(password.into()),
        }
    }

    /// Private key credential without a passphrase.
    #[must_use]
    pub fn key(path: impl Into<String>) -> Self {
        Self::Key {
            path: path.into(),
            passphrase: None,
        }
    }

    /// Build a credential from loosely-typed inputs: a non-empty private key
    /// path takes precedence over a password; with neither, this is a
    /// configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::ConfigInvalid`] if no usable credential is
    /// supplied.
    pub fn from_parts(
        password: Option<String>,
        private_key_path: Option<String>,
    ) -> Result<Self> {
        if let Some(path) = private_key_path.filter(|p| !p.trim().is_empty()) {
            return Ok(Self::Key {
                path,
                passphrase: None,
            });
        }

        match password {
            Some(p) if !p.trim().is_empty() => Ok(Self::Password {
                password: Zeroizing::new(p),
            }),
            _ => Err(CourierError::ConfigInvalid {
                field: "auth".to_string(),
                reason: "Either a password or a private key path is required".to_string(),
            }),
        }
    }

    #[must_use]
    pub const fn uses_key(&self) -> bool {
        matches!(self, Self::Key { .. })
    }

    fn validate(&self, field_prefix: &str) -> Result<()> {
        match self {
            Self::Key { path, .. } if path.trim().is_empty() => {
                Err(CourierError::ConfigInvalid {
                    field: format!("{field_prefix}.auth.path"),
                    reason: "Private key path cannot be empty".to_string(),
                })
            }
            Self::Password { password } if password.trim().is_empty() => {
                Err(CourierError::ConfigInvalid {
                    field: format!("{field_prefix}.auth.password"),
                    reason: "Password cannot be empty".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { path, passphrase } => f
                .debug_struct("Key")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Password { .. } => f
                .debug_struct("Password")
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,

    #[serde(default = "default_keepalive")]
    pub keepalive_interval_seconds: u64,

    /// Buffer size in bytes for streaming transfers
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            connection_timeout_seconds: default_connection_timeout(),
            keepalive_interval_seconds: default_keepalive(),
            chunk_size: default_chunk_size(),
        }
    }
}

const fn default_connection_timeout() -> u64 {
    30
}

const fn default_keepalive() -> u64 {
    15
}

const fn default_chunk_size() -> usize {
    1024 * 1024
}
