//! wlms-sv (Shipment Verification) - scan reconciliation service
//!
//! Scanning devices submit package scans for an inbound shipment; operators
//! finalize verification, upload vehicle assignments and pull the
//! reconciliation report. Shares wlms.db with the manifest pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use wlms_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver,
};
use wlms_sv::{build_router, AppState};

const MODULE_NAME: &str = "wlms-sv";

#[derive(Debug, Parser)]
#[command(name = "wlms-sv", version, about = "Shipment verification service")]
struct Args {
    /// Root folder holding wlms.db (overrides env and config file)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// HTTP port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Path to the TOML bootstrap file
    #[arg(long, env = "WLMS_SV_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(|| default_config_path(MODULE_NAME));
    let config = load_toml_config(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting WLMS Shipment Verification ({}) v{} [{}] built {} ({})",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Config was loaded before the subscriber existed; report where it came from now
    match config_path.as_deref() {
        Some(path) if path.exists() => info!("Configuration file: {}", path.display()),
        Some(path) => warn!("Config file not found at {}, using defaults", path.display()),
        None => warn!("No configuration file location available, using defaults"),
    }

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .with_toml(&config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = wlms_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;
    info!("✓ Connected to database");

    let state = AppState::new(pool, config.max_lock_wait_ms);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("wlms-sv listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
