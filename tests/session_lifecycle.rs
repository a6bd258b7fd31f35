//! Session Lifecycle Tests
//!
//! These tests exercise the session state machine without a remote server:
//! construction-time validation, close idempotency, operation-before-connect
//! guards, and connect failures that need no listening peer.

use std::path::Path;

use sftp_courier::config::{AuthConfig, HostConfig, LimitsConfig};
use sftp_courier::digest::DigestAlgorithm;
use sftp_courier::error::CourierError;
use sftp_courier::ssh::DeliverySession;

fn password_host() -> HostConfig {
    HostConfig {
        hostname: "files.example.com".to_string(),
        port: 22,
        user: "alice".to_string(),
        auth: AuthConfig::password("secret"),
        description: None,
    }
}

fn short_limits() -> LimitsConfig {
    LimitsConfig {
        connection_timeout_seconds: 2,
        ..LimitsConfig::default()
    }
}

// ============== Construction ==============

#[test]
fn test_construction_validates_eagerly() {
    let mut config = password_host();
    config.hostname = "   ".to_string();
    let err = DeliverySession::new(config).unwrap_err();
    assert!(
        matches!(err, CourierError::ConfigInvalid { field, .. } if field.contains("hostname"))
    );

    let mut config = password_host();
    config.port = 0;
    assert!(DeliverySession::new(config).is_err());

    let mut config = password_host();
    config.user = String::new();
    assert!(DeliverySession::new(config).is_err());

    let mut config = password_host();
    config.auth = AuthConfig::password("");
    assert!(DeliverySession::new(config).is_err());
}

// ============== Close Idempotency ==============

#[tokio::test]
async fn test_close_never_connected() {
    let mut session = DeliverySession::new(password_host()).unwrap();
    session.close().await;
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_close_many_times() {
    let mut session = DeliverySession::new(password_host()).unwrap();
    for _ in 0..5 {
        session.close().await;
        assert!(!session.is_connected());
    }
}

// ============== Operation-Before-Connect Guards ==============

#[tokio::test]
async fn test_upload_on_closed_session() {
    let mut session = DeliverySession::new(password_host()).unwrap();
    let err = session
        .upload(Path::new("report.pdf"), "/incoming/report.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, CourierError::NotConnected));
}

#[tokio::test]
async fn test_download_on_closed_session_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("downloaded.pdf");

    let mut session = DeliverySession::new(password_host()).unwrap();
    let err = session
        .download("/incoming/report.pdf", &target)
        .await
        .unwrap_err();

    assert!(matches!(err, CourierError::NotConnected));
    assert!(!target.exists(), "guard must fire before any local write");
}

#[tokio::test]
async fn test_verified_upload_on_closed_session() {
    let mut session = DeliverySession::new(password_host()).unwrap();
    let err = session
        .verified_upload(
            Path::new("report.pdf"),
            "/incoming/report.pdf",
            DigestAlgorithm::Sha256,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CourierError::NotConnected));
}

// ============== Connect Failures ==============

#[tokio::test]
async fn test_connect_with_missing_key_file() {
    let config = HostConfig {
        hostname: "files.example.com".to_string(),
        port: 22,
        user: "alice".to_string(),
        auth: AuthConfig::key("/nonexistent/keys/id_ed25519"),
        description: None,
    };

    let mut session = DeliverySession::with_limits(config, short_limits()).unwrap();
    let err = session.connect().await.unwrap_err();

    // The key is loaded before the network is touched, so this fails as a
    // key-load error even with no server reachable
    assert!(matches!(err, CourierError::KeyLoad { .. }));
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_connect_refused_surfaces_connection_error() {
    // Port 1 on loopback: nothing listens there, the dial fails fast
    let config = HostConfig {
        hostname: "127.0.0.1".to_string(),
        port: 1,
        user: "alice".to_string(),
        auth: AuthConfig::password("secret"),
        description: None,
    };

    let mut session = DeliverySession::with_limits(config, short_limits()).unwrap();
    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, CourierError::Connection { .. }));
    assert!(!session.is_connected());

    // A failed connect leaves the session reusable: close stays a no-op
    session.close().await;
    assert!(!session.is_connected());
}
