//! Common test utilities for service registry integration tests

use service_registry::{
    RegistryClient, RegistryConfig, RegistryServer, RegistryStore, ServerConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test timeout for async operations
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A registry server running on an ephemeral port
pub struct TestRegistry {
    /// Bound address
    pub addr: SocketAddr,
    /// Store shared with the running server
    pub store: Arc<RegistryStore>,
    shutdown: CancellationToken,
    handle: JoinHandle<service_registry::Result<()>>,
}

impl TestRegistry {
    /// Start a registry with the given staleness window
    pub async fn start(window_secs: u64) -> Self {
        let mut config = RegistryConfig {
            server: ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
            },
            ..RegistryConfig::default()
        };
        config.staleness.window_secs = window_secs;

        let store = Arc::new(RegistryStore::new(config.staleness.window().unwrap()));
        let server = RegistryServer::bind_with_store(config, store.clone())
            .await
            .expect("Failed to bind registry");
        let addr = server.local_addr().expect("Failed to read local address");

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve(shutdown.clone()));

        Self {
            addr,
            store,
            shutdown,
            handle,
        }
    }

    /// Base URL of the running registry
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client pointed at the running registry
    pub fn client(&self) -> RegistryClient {
        RegistryClient::new(self.url(), Duration::from_secs(5))
    }

    /// Stop the server and wait for it to exit
    pub async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(TEST_TIMEOUT, self.handle)
            .await
            .expect("Registry did not stop")
            .expect("Registry task panicked")
            .expect("Registry returned an error");
    }
}
