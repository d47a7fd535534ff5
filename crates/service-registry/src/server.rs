//! Registry HTTP server

use crate::{
    api::create_router,
    config::RegistryConfig,
    error::Result,
    registry::Registry,
    store::RegistryStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Registry server bound to a listener
pub struct RegistryServer {
    registry: Registry,
    /// The TCP listener
    listener: TcpListener,
    config: RegistryConfig,
}

impl RegistryServer {
    /// Bind the configured listen address with a fresh store
    pub async fn bind(config: RegistryConfig) -> Result<Self> {
        let store = Arc::new(RegistryStore::new(config.staleness.window()?));
        Self::bind_with_store(config, store).await
    }

    /// Bind the configured listen address serving an existing store
    pub async fn bind_with_store(config: RegistryConfig, store: Arc<RegistryStore>) -> Result<Self> {
        config.staleness.validate()?;
        let listener = TcpListener::bind(&config.server.listen_addr).await?;
        info!(
            "Registry listening on {} (staleness window {}s)",
            listener.local_addr()?,
            config.staleness.window_secs
        );

        Ok(Self {
            registry: Registry::new(store),
            listener,
            config,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get the registry reference
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Serve requests until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let reaper = self.config.staleness.reap_after()?.map(|max_age| {
            info!("Reaping records older than {}s", max_age.num_seconds());
            self.registry.spawn_reaper(
                max_age,
                self.config.staleness.reap_interval(),
                shutdown.child_token(),
            )
        });

        let router = create_router(self.registry.clone());
        let signal = shutdown.clone();
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await?;

        shutdown.cancel();
        if let Some(reaper) = reaper {
            let _ = reaper.await;
        }
        info!("Registry server stopped");
        Ok(())
    }
}
