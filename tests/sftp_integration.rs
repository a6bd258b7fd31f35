//! SFTP Integration Tests
//!
//! These tests require a real SSH server with SFTP support to be available.
//! Configure connection in: `tests/sftp_test_config.yaml`
//!
//! Run with: `cargo test --test sftp_integration -- --ignored`
//!
//! Note: These tests are ignored by default to avoid CI failures
//! when no SSH server is available.

use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use sftp_courier::config::{AuthConfig, HostConfig, LimitsConfig};
use sftp_courier::digest::{DigestAlgorithm, file_digest};
use sftp_courier::error::CourierError;
use sftp_courier::ssh::DeliverySession;
use tempfile::NamedTempFile;

/// Test configuration loaded from YAML
#[derive(Debug, Deserialize)]
struct TestConfig {
    sftp_test: SftpTestConfig,
}

#[derive(Debug, Deserialize)]
struct SftpTestConfig {
    hostname: String,
    port: u16,
    user: String,
    auth: AuthConfigYaml,
    remote_test_dir: String,
}

#[derive(Debug, Deserialize)]
struct AuthConfigYaml {
    key: Option<KeyAuth>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyAuth {
    path: String,
}

/// Load test configuration from YAML file
fn load_test_config() -> Option<TestConfig> {
    let config_path = Path::new("tests/sftp_test_config.yaml");
    if !config_path.exists() {
        eprintln!(
            "Skipping: tests/sftp_test_config.yaml not found\n\
             Copy tests/sftp_test_config.example.yaml and fill with real values."
        );
        return None;
    }

    let content =
        std::fs::read_to_string(config_path).expect("Failed to read tests/sftp_test_config.yaml");

    serde_saphyr::from_str(&content).expect("Failed to parse tests/sftp_test_config.yaml")
}

/// Convert test config to a `HostConfig`
fn to_host_config(config: &SftpTestConfig) -> HostConfig {
    let auth = if let Some(ref key) = config.auth.key {
        AuthConfig::key(key.path.clone())
    } else if let Some(ref password) = config.auth.password {
        AuthConfig::password(password.clone())
    } else {
        panic!("No valid auth method configured");
    };

    HostConfig {
        hostname: config.hostname.clone(),
        port: config.port,
        user: config.user.clone(),
        auth,
        description: Some("Integration test host".to_string()),
    }
}

fn test_limits() -> LimitsConfig {
    LimitsConfig {
        connection_timeout_seconds: 10,
        keepalive_interval_seconds: 15,
        chunk_size: 64 * 1024,
    }
}

async fn connected_session(config: &SftpTestConfig) -> DeliverySession {
    let mut session =
        DeliverySession::with_limits(to_host_config(config), test_limits()).unwrap();
    session.connect().await.expect("connect failed");
    session
}

/// Create a temporary file with specified content
fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[tokio::test]
#[ignore = "requires real SFTP server"]
async fn test_upload_download_round_trip() {
    let Some(config) = load_test_config() else {
        return;
    };
    let config = config.sftp_test;
    let remote_path = format!("{}/round_trip.bin", config.remote_test_dir);

    let content = b"The quick brown fox jumps over the lazy dog";
    let local = create_temp_file(content);

    let mut session = connected_session(&config).await;

    let uploaded = session.upload(local.path(), &remote_path).await.unwrap();
    assert_eq!(uploaded.bytes_transferred, content.len() as u64);

    let download_target = NamedTempFile::new().unwrap();
    let downloaded = session
        .download(&remote_path, download_target.path())
        .await
        .unwrap();
    assert_eq!(downloaded.bytes_transferred, content.len() as u64);

    let round_tripped = std::fs::read(download_target.path()).unwrap();
    assert_eq!(round_tripped, content);

    session.close().await;
}

#[tokio::test]
#[ignore = "requires real SFTP server"]
async fn test_verified_upload_empty_file() {
    let Some(config) = load_test_config() else {
        return;
    };
    let config = config.sftp_test;
    let remote_path = format!("{}/empty.bin", config.remote_test_dir);

    let local = create_temp_file(b"");

    let mut session = connected_session(&config).await;
    let verified = session
        .verified_upload(local.path(), &remote_path, DigestAlgorithm::Md5)
        .await
        .unwrap();
    assert!(verified);

    session.close().await;
}

#[tokio::test]
#[ignore = "requires real SFTP server"]
async fn test_verified_upload_multi_chunk_sha256() {
    let Some(config) = load_test_config() else {
        return;
    };
    let config = config.sftp_test;
    let remote_path = format!("{}/large.bin", config.remote_test_dir);

    // 10 MiB of patterned data: many transfer chunks, many digest chunks
    let content: Vec<u8> = (0..10 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let local = create_temp_file(&content);

    let mut session = connected_session(&config).await;
    let verified = session
        .verified_upload(local.path(), &remote_path, DigestAlgorithm::Sha256)
        .await
        .unwrap();
    assert!(verified);

    session.close().await;
}

#[tokio::test]
#[ignore = "requires real SFTP server"]
async fn test_corrupted_remote_copy_is_detected() {
    let Some(config) = load_test_config() else {
        return;
    };
    let config = config.sftp_test;
    let remote_path = format!("{}/corrupt.bin", config.remote_test_dir);

    let original = create_temp_file(b"original delivery content");
    let tampered = create_temp_file(b"tampered delivery content");

    let mut session = connected_session(&config).await;

    let verified = session
        .verified_upload(original.path(), &remote_path, DigestAlgorithm::Sha256)
        .await
        .unwrap();
    assert!(verified);

    // Corrupt the remote copy, then compare against the original source
    session.upload(tampered.path(), &remote_path).await.unwrap();

    let local_hex = file_digest(original.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();
    let remote_hex = session
        .remote_digest(&remote_path, DigestAlgorithm::Sha256)
        .await
        .unwrap();
    assert_ne!(local_hex, remote_hex, "corruption must change the digest");

    // And the remote digest matches what was actually written
    let tampered_hex = file_digest(tampered.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();
    assert_eq!(remote_hex, tampered_hex);

    session.close().await;
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[tokio::test]
#[ignore = "requires real SFTP server"]
async fn test_download_missing_remote_file() {
    let Some(config) = load_test_config() else {
        return;
    };
    let config = config.sftp_test;
    let remote_path = format!("{}/does_not_exist.bin", config.remote_test_dir);

    let mut session = connected_session(&config).await;
    let target = NamedTempFile::new().unwrap();
    let err = session
        .download(&remote_path, target.path())
        .await
        .unwrap_err();
    assert!(matches!(err, CourierError::RemoteRead { .. }));

    session.close().await;
}

#[tokio::test]
#[ignore = "requires real SFTP server"]
async fn test_upload_to_missing_parent_directory() {
    let Some(config) = load_test_config() else {
        return;
    };
    let config = config.sftp_test;
    let remote_path = format!(
        "{}/no_such_subdir/report.bin",
        config.remote_test_dir
    );

    let local = create_temp_file(b"content");

    let mut session = connected_session(&config).await;
    let err = session.upload(local.path(), &remote_path).await.unwrap_err();
    assert!(matches!(err, CourierError::RemoteWrite { .. }));

    session.close().await;
}

#[tokio::test]
#[ignore = "requires real SFTP server"]
async fn test_reconnect_after_close() {
    let Some(config) = load_test_config() else {
        return;
    };
    let config = config.sftp_test;
    let remote_path = format!("{}/reconnect.bin", config.remote_test_dir);

    let local = create_temp_file(b"first life");

    let mut session = connected_session(&config).await;
    session.upload(local.path(), &remote_path).await.unwrap();
    session.close().await;
    assert!(!session.is_connected());

    // The same session value reconnects after close
    session.connect().await.unwrap();
    let verified = session
        .verified_upload(local.path(), &remote_path, DigestAlgorithm::Md5)
        .await
        .unwrap();
    assert!(verified);

    session.close().await;
}
