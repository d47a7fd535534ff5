//! Standalone service registry server

use anyhow::Result;
use clap::Parser;
use service_registry::{RegistryConfig, RegistryServer};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "registry-server")]
#[command(about = "Service registry for relay nodes and capability endpoints", long_about = None)]
struct Args {
    /// YAML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    listen: Option<String>,

    /// Seconds after which an un-refreshed record is hidden from listings
    #[arg(long)]
    staleness_window: Option<u64>,

    /// Seconds after which an un-refreshed record is removed
    #[arg(long)]
    reap_after: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RegistryConfig::from_file(path)?,
        None => RegistryConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(window) = args.staleness_window {
        config.staleness.window_secs = window;
    }
    if let Some(reap_after) = args.reap_after {
        config.staleness.reap_after_secs = Some(reap_after);
    }

    let server = RegistryServer::bind(config).await?;
    info!("Service registry starting on {}", server.local_addr()?);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            signal.cancel();
        }
    });

    server.serve(shutdown).await?;
    Ok(())
}
