// Accessors like ZoneEngine::render are exercised by tests only
#![allow(dead_code)]

//! TLD Zone Manager
//!
//! Administers the records of a single authoritative zone file over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TLD ZONE MANAGER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP API (80)         ←── Add / Delete / Query records     │
//! │  Zone Engine           ←── Validates, edits, bumps serial   │
//! │  Zone File             ←── Rewritten after every mutation   │
//! │  Name-Server Control   ←── rndc reload / systemctl          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

mod api;
mod config;
mod control;
mod types;
mod zone;

use api::Metrics;
use config::ManagerConfig;
use control::{NameServerControl, SystemControl};
use zone::{ZoneEngine, ZoneFile};

/// TLD Zone Manager - HTTP administration of an authoritative zone file
#[derive(Parser, Debug)]
#[command(name = "tld-zone-manager")]
#[command(author = "TLD Zone Manager Contributors")]
#[command(version)]
#[command(about = "Manage the records of an authoritative zone file over HTTP", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "zone-manager.toml")]
    config: PathBuf,

    /// Zone file to manage (overrides the configuration)
    #[arg(short, long)]
    zone_file: Option<PathBuf>,

    /// HTTP API port (overrides the configuration)
    #[arg(long)]
    api_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the default zone skeleton to this path and exit
    #[arg(long)]
    write_skeleton: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into())
        )
        .init();

    info!("🌐 TLD Zone Manager v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        ManagerConfig::load(&args.config)?
    } else {
        warn!("Config file {:?} not found, using defaults", args.config);
        ManagerConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_zone_file(args.zone_file)
        .with_api_port(args.api_port);

    config.validate()?;

    if let Some(path) = &args.write_skeleton {
        return write_skeleton(&config, path).await;
    }

    info!("⚙️  Configuration:");
    info!("   Zone file: {:?}", config.zone_file);
    info!("   API address: {}:{}", config.listen_address, config.api_port);
    info!("   Create if missing: {}", config.create_if_missing);
    info!("   Auto reload: {}", config.auto_reload);

    let shared_config = Arc::new(config);

    // Open the zone
    let engine = Arc::new(
        ZoneEngine::open(
            ZoneFile::new(&shared_config.zone_file),
            &shared_config.skeleton,
            shared_config.create_if_missing,
        )
        .await?,
    );
    match engine.serial().await {
        Ok(serial) => info!("📝 Zone serial: {}, {} records", serial, engine.record_count().await),
        Err(e) => warn!("Zone serial unavailable: {}", e),
    }

    let control: Arc<dyn NameServerControl> =
        Arc::new(SystemControl::new(shared_config.nameserver.clone()));

    // Initialize metrics
    let metrics = Arc::new(Metrics::new());

    let api_handle = tokio::spawn(api::run_api_server(
        shared_config.clone(),
        engine.clone(),
        control,
        metrics,
    ));

    info!("✅ Zone manager started");
    info!("   Press Ctrl+C to shutdown gracefully");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = api_handle => {
            error!("HTTP API exited: {:?}", result);
        }
    }

    info!("👋 TLD Zone Manager shutting down");
    Ok(())
}

/// Render the default skeleton to a file
async fn write_skeleton(config: &ManagerConfig, path: &Path) -> anyhow::Result<()> {
    let skeleton = config.skeleton.to_document();
    ZoneFile::new(path).save(&skeleton).await?;

    info!("📄 Default zone skeleton written to {:?}", path);
    info!("   Serial: {}", config.skeleton.initial_serial());

    Ok(())
}
