//! CLI runner functions
//!
//! Each runner builds a session for the requested host alias, performs one
//! operation, and closes the session on every exit path.

use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::digest::{DigestAlgorithm, file_digest};
use crate::error::{CourierError, Result};
use crate::ssh::{DeliverySession, TransferProgress, TransferResult};

fn lookup_host<'a>(config: &'a Config, alias: &str) -> Result<&'a crate::config::HostConfig> {
    config
        .hosts
        .get(alias)
        .ok_or_else(|| CourierError::UnknownHost {
            host: alias.to_string(),
        })
}

fn open_session(config: &Config, alias: &str) -> Result<DeliverySession> {
    let host_config = lookup_host(config, alias)?;
    DeliverySession::with_limits(host_config.clone(), config.limits.clone())
}

/// Progress printer for the terminal, enabled by `--progress`
fn progress_printer(enabled: bool) -> Option<impl FnMut(TransferProgress)> {
    enabled.then(|| {
        |p: TransferProgress| {
            eprint!(
                "\r{:>5.1}% ({}/{} bytes)",
                p.percentage, p.bytes_transferred, p.total_bytes
            );
            let _ = io::stderr().flush();
        }
    })
}

fn print_transfer(verb: &str, from: &str, to: &str, result: &TransferResult) {
    println!(
        "{verb} {from} -> {to} ({} bytes in {} ms, {:.0} B/s)",
        result.bytes_transferred, result.duration_ms, result.bytes_per_second
    );
}

/// Upload a file to a remote host
///
/// # Errors
///
/// Returns an error if the host alias is unknown, the connection or
/// authentication fails, or the transfer fails.
pub async fn run_upload(
    config: &Config,
    host: &str,
    local_path: &Path,
    remote_path: &str,
    progress: bool,
) -> Result<()> {
    let mut session = open_session(config, host)?;
    session.connect().await?;

    let outcome = session
        .upload_with(local_path, remote_path, progress_printer(progress))
        .await;
    session.close().await;
    if progress {
        eprintln!();
    }

    let result = outcome?;
    info!(
        host = %host,
        bytes = result.bytes_transferred,
        duration_ms = result.duration_ms,
        "Upload complete"
    );
    print_transfer("Uploaded", &local_path.display().to_string(), remote_path, &result);

    Ok(())
}

/// Download a file from a remote host
///
/// # Errors
///
/// Returns an error if the host alias is unknown, the connection or
/// authentication fails, or the transfer fails.
pub async fn run_download(
    config: &Config,
    host: &str,
    remote_path: &str,
    local_path: &Path,
    progress: bool,
) -> Result<()> {
    let mut session = open_session(config, host)?;
    session.connect().await?;

    let outcome = session
        .download_with(remote_path, local_path, progress_printer(progress))
        .await;
    session.close().await;
    if progress {
        eprintln!();
    }

    let result = outcome?;
    info!(
        host = %host,
        bytes = result.bytes_transferred,
        duration_ms = result.duration_ms,
        "Download complete"
    );
    print_transfer("Downloaded", remote_path, &local_path.display().to_string(), &result);

    Ok(())
}

/// Upload a file and verify the delivery by digest comparison.
///
/// Returns whether the digests matched; the caller maps a mismatch to the
/// process exit code.
///
/// # Errors
///
/// Returns an error if the algorithm name is unknown, the host alias is
/// unknown, the connection or authentication fails, or the transfer or
/// digest computation fails.
pub async fn run_deliver(
    config: &Config,
    host: &str,
    local_path: &Path,
    remote_path: &str,
    algorithm: &str,
    progress: bool,
) -> Result<bool> {
    let algorithm = DigestAlgorithm::parse(algorithm)?;

    let mut session = open_session(config, host)?;
    session.connect().await?;

    let outcome = session
        .verified_upload_with(
            local_path,
            remote_path,
            algorithm,
            progress_printer(progress),
        )
        .await;
    session.close().await;
    if progress {
        eprintln!();
    }

    let verified = outcome?;
    if verified {
        println!(
            "Delivered {} -> {} ({algorithm} digests match)",
            local_path.display(),
            remote_path
        );
    } else {
        println!(
            "Delivery FAILED verification: {algorithm} digest mismatch for {remote_path} \
             (remote copy left in place)"
        );
    }

    Ok(verified)
}

/// Compute and print the digest of a local file, `md5sum`-style
///
/// # Errors
///
/// Returns an error if the algorithm name is unknown or the file cannot be
/// read.
pub async fn run_checksum(path: &Path, algorithm: &str) -> Result<()> {
    let algorithm = DigestAlgorithm::parse(algorithm)?;
    let digest = file_digest(path, algorithm).await?;
    println!("{digest}  {}", path.display());
    Ok(())
}

/// Show configured hosts and limits
pub fn run_status(config: &Config) {
    println!("SFTP Courier Status");
    println!("===================\n");

    println!("Configured Hosts ({}):", config.hosts.len());
    println!("{:-<60}", "");

    if config.hosts.is_empty() {
        println!("  (no hosts configured)");
    } else {
        for (alias, host) in &config.hosts {
            println!("\n  {alias}: {host}");
            if let Some(ref desc) = host.description {
                println!("    Description: {desc}");
            }
        }
    }

    println!("\nLimits:");
    println!(
        "  Connection timeout: {}s",
        config.limits.connection_timeout_seconds
    );
    println!(
        "  Keepalive interval: {}s",
        config.limits.keepalive_interval_seconds
    );
    println!("  Transfer chunk size: {} bytes", config.limits.chunk_size);
}
