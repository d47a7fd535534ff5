//! Relay node HTTP server and lifecycle

use crate::{api::create_router, config::RelayConfig, error::Result, liveness::LivenessTask, relay::Relay};
use service_registry::{RegistrationRequest, RegistryClient, ServiceStatus};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Relay node bound to a listener
pub struct RelayServer {
    relay: Arc<Relay>,
    /// The TCP listener
    listener: TcpListener,
    registry: RegistryClient,
    registration: RegistrationRequest,
    config: RelayConfig,
}

impl RelayServer {
    /// Bind the configured listen address
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        let local_addr = listener.local_addr()?;

        let advertise_url = advertise_url(&config, local_addr);
        let registry = RegistryClient::new(&config.registry_url, config.registry_timeout());
        let registration = RegistrationRequest::new(
            config.service_id.clone(),
            config.service_type,
            advertise_url,
            config.effective_capabilities(),
        )
        .with_status(ServiceStatus::Starting);

        info!(
            "Relay node {} listening on {}, advertised as {}",
            config.service_id, local_addr, registration.address
        );

        Ok(Self {
            relay: Arc::new(Relay::new(&config, registry.clone())),
            listener,
            registry,
            registration,
            config,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// URL this node registers under
    pub fn advertise_url(&self) -> &str {
        &self.registration.address
    }

    /// Get the relay reference
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Register, serve until `shutdown` is cancelled, then deregister
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let service_id = self.registration.service_id.clone();

        match self.registry.register(&self.registration).await {
            Ok(_) => info!("Registered {} with {}", service_id, self.registry.base_url()),
            Err(e) => warn!(
                "Could not register {} with {}, serving anyway: {}",
                service_id,
                self.registry.base_url(),
                e
            ),
        }

        let liveness = LivenessTask::spawn(
            self.registry.clone(),
            self.registration.clone(),
            self.config.heartbeat_interval(),
            shutdown.child_token(),
        );

        let router = create_router(self.relay.clone());
        let signal = shutdown.clone();
        let served = axum::serve(self.listener, router)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await;

        liveness.stop().await;
        match self.registry.deregister(&service_id).await {
            Ok(()) => info!("Deregistered {}", service_id),
            Err(e) => warn!("Could not deregister {}: {}", service_id, e),
        }

        served?;
        info!("Relay node {} stopped", service_id);
        Ok(())
    }
}

/// URL peers are told to use: the configured one, else the bound address
fn advertise_url(config: &RelayConfig, local_addr: SocketAddr) -> String {
    if let Some(url) = &config.advertise_url {
        return url.clone();
    }
    if local_addr.ip().is_unspecified() {
        warn!(
            "Listening on {} without advertise_url; peers on other hosts cannot reach http://{}",
            local_addr, local_addr
        );
    }
    format!("http://{local_addr}")
}
