//! CLI module for direct command-line usage
//!
//! Delivers files to hosts defined in the YAML configuration and verifies
//! uploads by streamed checksum comparison.

mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use runner::{run_checksum, run_deliver, run_download, run_status, run_upload};

/// SFTP Courier - Verified file delivery over SFTP
#[derive(Parser)]
#[command(name = "sftp-courier")]
#[command(about = "Deliver files over SFTP with checksum verification")]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Upload a report
    sftp-courier upload archive ./report.pdf /incoming/report.pdf

    # Upload and verify the delivery (sha256 digests must match)
    sftp-courier deliver archive ./report.pdf /incoming/report.pdf --algorithm sha256

    # Download a file
    sftp-courier download archive /incoming/report.pdf ./report.pdf

    # Checksum a local file
    sftp-courier checksum ./report.pdf --algorithm md5

    # Show configured hosts
    sftp-courier status")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Upload a file to a remote host via SFTP
    Upload {
        /// Host alias from configuration
        host: String,

        /// Local file path
        local_path: PathBuf,

        /// Remote destination path
        remote_path: String,

        /// Show transfer progress
        #[arg(long, short)]
        progress: bool,
    },

    /// Download a file from a remote host via SFTP
    Download {
        /// Host alias from configuration
        host: String,

        /// Remote file path
        remote_path: String,

        /// Local destination path
        local_path: PathBuf,

        /// Show transfer progress
        #[arg(long, short)]
        progress: bool,
    },

    /// Upload a file and verify the delivery by digest comparison
    Deliver {
        /// Host alias from configuration
        host: String,

        /// Local file path
        local_path: PathBuf,

        /// Remote destination path
        remote_path: String,

        /// Digest algorithm: md5, sha1, sha256, sha512
        #[arg(long, default_value = "md5")]
        algorithm: String,

        /// Show transfer progress
        #[arg(long, short)]
        progress: bool,
    },

    /// Compute the digest of a local file
    Checksum {
        /// Local file path
        path: PathBuf,

        /// Digest algorithm: md5, sha1, sha256, sha512
        #[arg(long, default_value = "md5")]
        algorithm: String,
    },

    /// Show configured hosts
    Status,
}
