use std::path::Path;

use tracing::warn;

use super::types::Config;
use crate::error::{CourierError, Result};

/// Load configuration from a YAML file
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file does not exist
/// - The file cannot be read
/// - The YAML content is invalid or cannot be parsed
/// - The configuration fails validation (no hosts, empty fields, bad port)
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(CourierError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    // Warn if config file has overly permissive permissions (may contain secrets)
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.mode() & 0o777;
            if mode & 0o037 != 0 {
                warn!(
                    config_path = %path.display(),
                    permissions = format!("{mode:04o}"),
                    "Config file may contain secrets and has permissive permissions. \
                     Consider: chmod 640 {}",
                    path.display()
                );
            }
        }
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_saphyr::from_str(&content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    // Must have at least one host
    if config.hosts.is_empty() {
        return Err(CourierError::ConfigInvalid {
            field: "hosts".to_string(),
            reason: "At least one host must be defined".to_string(),
        });
    }

    for (name, host) in &config.hosts {
        host.validate(&format!("hosts.{name}"))?;
    }

    Ok(())
}

/// Get the default config path
#[must_use]
pub fn default_config_path() -> std::path::PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("sftp-courier")
        .join("config.yaml")
}
