use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid { field: String, reason: String },

    #[error("Unknown host: {host}")]
    UnknownHost { host: String },

    // Connection errors
    #[error("SSH connection failed to {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("SSH authentication failed for {user}@{host}")]
    AuthFailed { user: String, host: String },

    #[error("Cannot load private key {path}: {reason}")]
    KeyLoad { path: String, reason: String },

    // SFTP channel errors
    #[error("SFTP error: {reason}")]
    Sftp { reason: String },

    #[error("SFTP session not established")]
    NotConnected,

    // Transfer errors
    #[error("Cannot read local file {path}: {reason}")]
    LocalRead { path: String, reason: String },

    #[error("Cannot write local file {path}: {reason}")]
    LocalWrite { path: String, reason: String },

    #[error("Cannot read remote file {path}: {reason}")]
    RemoteRead { path: String, reason: String },

    #[error("Cannot write remote file {path}: {reason}")]
    RemoteWrite { path: String, reason: String },

    // Digest errors
    #[error("Unsupported digest algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // YAML errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

pub type Result<T> = std::result::Result<T, CourierError>;
