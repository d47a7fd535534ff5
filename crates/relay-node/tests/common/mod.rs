//! Common test utilities for relay node integration tests

#![allow(dead_code)]

use axum::{Json, Router, http::HeaderMap, routing::post};
use relay_node::{BackendConfig, BackendKind, RelayConfig, RelayServer};
use serde_json::{Value, json};
use service_registry::{
    RegistryClient, RegistryConfig, RegistryServer, RegistryStore, ServerConfig, ServiceStatus,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test timeout for async operations
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A background server stopped through its cancellation token
pub struct Running<T> {
    /// Bound address
    pub addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<T>,
}

impl<T> Running<T> {
    /// Base URL of the server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Cancel the server and wait for it to exit
    pub async fn stop(self) -> T {
        self.shutdown.cancel();
        tokio::time::timeout(TEST_TIMEOUT, self.handle)
            .await
            .expect("Server did not stop")
            .expect("Server task panicked")
    }
}

/// Registry server on an ephemeral port, with its store exposed
pub struct TestRegistry {
    /// Running server
    pub server: Running<service_registry::Result<()>>,
    /// Store shared with the running server
    pub store: Arc<RegistryStore>,
}

impl TestRegistry {
    /// Start a registry with the default staleness window
    pub async fn start() -> Self {
        let config = RegistryConfig {
            server: ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
            },
            ..RegistryConfig::default()
        };
        let store = Arc::new(RegistryStore::new(config.staleness.window().unwrap()));
        let server = RegistryServer::bind_with_store(config, store.clone())
            .await
            .expect("Failed to bind registry");
        let addr = server.local_addr().expect("Failed to read local address");

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve(shutdown.clone()));
        Self {
            server: Running {
                addr,
                shutdown,
                handle,
            },
            store,
        }
    }

    /// Base URL of the registry
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Client pointed at the registry
    pub fn client(&self) -> RegistryClient {
        RegistryClient::new(self.url(), Duration::from_secs(5))
    }

    /// Stop the registry
    pub async fn stop(self) {
        self.server.stop().await.expect("Registry returned an error");
    }
}

/// Serve `router` on an ephemeral port
pub async fn serve_router(router: Router) -> Running<()> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("Failed to read local address");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await
            .expect("Mock backend failed");
    });
    Running {
        addr,
        shutdown,
        handle,
    }
}

/// REST capability endpoint answering `/api/generate` after `delay`
pub async fn mock_rest_backend(delay: Duration) -> Running<()> {
    let router = Router::new()
        .route(
            "/api/generate",
            post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                tokio::time::sleep(delay).await;
                let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
                let trace_id = headers
                    .get("x-trace-id")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Json(json!({
                    "text": format!("Generated: {prompt}"),
                    "confidence": 0.9,
                    "model_used": "mock-rest",
                    "trace_id": trace_id,
                }))
            }),
        )
        .route(
            "/api/summarize",
            post(|| async { Json(json!({"error": "Summarizer offline", "details": "maintenance"})) }),
        );
    serve_router(router).await
}

/// GraphQL capability endpoint answering `generateText` and `translateText`
pub async fn mock_graphql_backend() -> Running<()> {
    let router = Router::new().route(
        "/graphql",
        post(|Json(body): Json<Value>| async move {
            let query = body["query"].as_str().unwrap_or_default();
            let variables = &body["variables"];
            if query.contains("generateText") {
                Json(json!({"data": {"generateText": {
                    "text": format!("GraphQL: {}", variables["prompt"].as_str().unwrap_or_default()),
                    "confidence": 0.8,
                    "modelUsed": "mock-graphql",
                }}}))
            } else if query.contains("translateText") {
                Json(json!({"data": {"translateText": {
                    "translatedText": "hola",
                    "confidence": 0.7,
                    "modelUsed": "mock-graphql",
                    "languagePair": format!(
                        "{}-{}",
                        variables["sourceLanguage"].as_str().unwrap_or_default(),
                        variables["targetLanguage"].as_str().unwrap_or_default()
                    ),
                }}}))
            } else {
                Json(json!({"data": null, "errors": [{"message": "Unsupported query"}]}))
            }
        }),
    );
    serve_router(router).await
}

/// Relay configuration for tests against `registry_url`
pub fn relay_config(
    service_id: &str,
    registry_url: &str,
    backend: Option<(BackendKind, String)>,
) -> RelayConfig {
    RelayConfig {
        service_id: service_id.to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        registry_url: registry_url.to_string(),
        backend: backend.map(|(kind, url)| BackendConfig {
            id: format!("{service_id}-backend"),
            kind,
            url,
        }),
        forward_timeout_ms: 500,
        registry_timeout_ms: 1_000,
        heartbeat_interval_secs: 1,
        ..RelayConfig::default()
    }
}

/// Start a relay node
pub async fn start_relay(config: RelayConfig) -> Running<relay_node::Result<()>> {
    let server = RelayServer::bind(config).await.expect("Failed to bind relay");
    let addr = server.local_addr().expect("Failed to read local address");

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.serve(shutdown.clone()));
    Running {
        addr,
        shutdown,
        handle,
    }
}

/// Poll `check` until it holds or the test timeout elapses
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}

/// Wait until the registry reports `service_id` as healthy
pub async fn wait_until_healthy(registry: &RegistryClient, service_id: &str) {
    eventually(move || async move {
        matches!(
            registry.get(service_id).await,
            Ok(record) if record.status == ServiceStatus::Healthy
        )
    })
    .await;
}
