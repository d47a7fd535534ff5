//! Relay node daemon

use anyhow::Result;
use clap::Parser;
use relay_node::{BackendConfig, BackendKind, RelayConfig, RelayServer};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "relay-node")]
#[command(about = "Relay node forwarding requests to capability endpoints and peers", long_about = None)]
struct Args {
    /// YAML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Identifier to register under
    #[arg(long)]
    service_id: Option<String>,

    /// Address to listen on
    #[arg(short, long)]
    listen: Option<String>,

    /// URL peers use to reach this node
    #[arg(long)]
    advertise_url: Option<String>,

    /// Base URL of the service registry
    #[arg(long)]
    registry_url: Option<String>,

    /// Base URL of a static capability endpoint
    #[arg(long)]
    backend_url: Option<String>,

    /// Transport of the static capability endpoint
    #[arg(long, value_enum, default_value_t = BackendKind::Rest)]
    backend_kind: BackendKind,

    /// Identifier of the static capability endpoint
    #[arg(long)]
    backend_id: Option<String>,

    /// Advertised capability, repeatable
    #[arg(long = "capability")]
    capabilities: Vec<String>,

    /// Forward call timeout in milliseconds
    #[arg(long)]
    forward_timeout_ms: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_file(path)?,
            None => RelayConfig::default(),
        };

        if let Some(service_id) = self.service_id {
            config.service_id = service_id;
        }
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(url) = self.advertise_url {
            config.advertise_url = Some(url);
        }
        if let Some(url) = self.registry_url {
            config.registry_url = url;
        }
        if let Some(url) = self.backend_url {
            let kind = self.backend_kind;
            let id = self
                .backend_id
                .unwrap_or_else(|| format!("{}-{}", config.service_id, kind.as_str()));
            config.backend = Some(BackendConfig { id, kind, url });
        }
        if !self.capabilities.is_empty() {
            config.capabilities = self.capabilities;
        }
        if let Some(timeout) = self.forward_timeout_ms {
            config.forward_timeout_ms = timeout;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config = Args::parse().into_config()?;
    info!(
        "Starting relay node {} (registry {})",
        config.service_id, config.registry_url
    );

    let server = RelayServer::bind(config).await?;

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
