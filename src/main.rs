use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sftp_courier::cli::{
    Cli, Commands, run_checksum, run_deliver, run_download, run_status, run_upload,
};
use sftp_courier::config::{Config, default_config_path, load_config};

fn resolve_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = path.unwrap_or_else(default_config_path);
    info!(config = %config_path.display(), "Loading configuration");
    load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging goes to stderr so command output on stdout stays scriptable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Upload {
            host,
            local_path,
            remote_path,
            progress,
        } => {
            let config = resolve_config(cli.config)?;
            run_upload(&config, &host, &local_path, &remote_path, progress).await?;
        }
        Commands::Download {
            host,
            remote_path,
            local_path,
            progress,
        } => {
            let config = resolve_config(cli.config)?;
            run_download(&config, &host, &remote_path, &local_path, progress).await?;
        }
        Commands::Deliver {
            host,
            local_path,
            remote_path,
            algorithm,
            progress,
        } => {
            let config = resolve_config(cli.config)?;
            let verified = run_deliver(
                &config,
                &host,
                &local_path,
                &remote_path,
                &algorithm,
                progress,
            )
            .await?;
            if !verified {
                std::process::exit(1);
            }
        }
        Commands::Checksum { path, algorithm } => {
            run_checksum(&path, &algorithm).await?;
        }
        Commands::Status => {
            let config = resolve_config(cli.config)?;
            run_status(&config);
        }
    }

    Ok(())
}
