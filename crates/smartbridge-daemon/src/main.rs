//! SmartBridge Daemon - Main entry point
//!
//! Publishes SmartThings devices as accessories and serves the HTTP endpoint
//! used to inspect and drive them.

mod api;
mod config;
mod host;
mod server;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "smartbridge")]
#[command(about = "SmartThings accessory bridge daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "smartbridge.toml")]
    config: PathBuf,

    /// Bind address for the HTTP endpoint
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single synchronization pass, print the report and exit
    #[arg(long)]
    sync_once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("SmartBridge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        api_url = %config.smartthings.api_url,
        policy = ?config.bridge.offline_policy,
        "Configuration loaded"
    );

    let state = state::AppState::new(config.clone()).await?;

    if args.sync_once {
        info!("Running single synchronization pass");
        let report = state.synchronizer.sync_once().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match state.synchronizer.sync_once().await {
            Ok(report) => info!(
                accessories = report.added.len() + report.restored.len(),
                "Initial synchronization complete"
            ),
            Err(e) => error!(error = %e, "Initial synchronization failed"),
        }
        server::run(state, &config.daemon.bind).await?;
    }

    Ok(())
}
