// Use mimalloc allocator when the feature is enabled (recommended for musl builds)
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod ssh;

pub use config::{AuthConfig, Config, HostConfig, LimitsConfig};
pub use digest::{DIGEST_CHUNK_SIZE, DigestAlgorithm, compute_digest, file_digest};
pub use error::{CourierError, Result};
pub use ssh::{
    DEFAULT_CHUNK_SIZE, DeliverySession, SftpClient, SshClient, TransferProgress, TransferResult,
};
