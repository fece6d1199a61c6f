//! Storefront CLI
//!
//! Command-line client for the storefront API:
//! 1. Loads configuration (API origin, timeouts, session file)
//! 2. Resumes the stored session, if any
//! 3. Runs one subcommand; expired tokens are refreshed transparently

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use api_client::{FileStorage, LogoutReason, StorefrontClient};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Commands;
use crate::config::{Config, LogFormat};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront API client")]
#[command(version)]
struct Cli {
    /// Config file (falls back to STOREFRONT_CONFIG, then ./storefront.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    init_tracing(config.log_format);
    info!(
        path = %config_path.display(),
        base_url = %config.api.base_url,
        session = %config.session.token_path.display(),
        "configuration loaded"
    );

    let client = StorefrontClient::builder()
        .base_url(config.api.base_url.clone())
        .timeout(config.api.timeout())
        .refresh_timeout(config.api.refresh_timeout())
        .storage(FileStorage::new(&config.session.token_path))
        .navigator(sign_in_prompt)
        .build()
        .context("failed to build API client")?;

    cli.command.execute(&client).await
}

/// Initialize tracing with LOG_LEVEL / RUST_LOG support. Logs go to stderr so
/// command output on stdout stays machine-readable.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// The CLI's signed-out entry point is the `login` subcommand.
fn sign_in_prompt(reason: LogoutReason) {
    let why = match reason {
        LogoutReason::ForcedByServer => "The server ended your session.",
        LogoutReason::RefreshRejected => "Your session could not be renewed.",
        LogoutReason::UserRequested => "Signed out.",
    };
    eprintln!("{why} Sign in again with `storefront login --email <EMAIL>`.");
}
