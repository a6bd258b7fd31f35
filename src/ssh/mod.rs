mod client;
pub mod session;
mod sftp;

pub use client::SshClient;
pub use session::DeliverySession;
pub use sftp::{DEFAULT_CHUNK_SIZE, SftpClient, TransferProgress, TransferResult};
