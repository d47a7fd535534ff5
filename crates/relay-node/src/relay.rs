//! Request handling: validate, resolve, forward, normalize

use crate::{
    config::{BackendConfig, RelayConfig},
    discovery::{Discovery, Target, TargetKind},
    error::{Error, Result},
    message::{Action, GenerateText, MessageEnvelope},
    result::RelayResult,
    transport::{self, GraphqlTransport, PeerTransport, RestTransport, Transport},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_registry::RegistryClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Status report of a relay node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Registered id of the node
    pub service_id: String,
    /// Always "online" while the node answers
    pub status: String,
    /// Seconds since the node started
    pub uptime: u64,
    /// Advertised capabilities
    pub capabilities: Vec<String>,
    /// Id of the static backend, if any
    pub backend: Option<String>,
}

/// The relay logic of one node
pub struct Relay {
    service_id: String,
    capabilities: Vec<String>,
    backend: Option<(BackendConfig, Arc<dyn Transport>)>,
    discovery: Discovery,
    http: reqwest::Client,
    forward_timeout: Duration,
    started: Instant,
}

impl Relay {
    /// Create the relay for `config`, discovering through `registry`
    pub fn new(config: &RelayConfig, registry: RegistryClient) -> Self {
        let http = reqwest::Client::new();
        let forward_timeout = config.forward_timeout();
        let backend = config.backend.clone().map(|b| {
            let transport = transport::for_backend(&b, http.clone(), forward_timeout);
            (b, transport)
        });

        Self {
            service_id: config.service_id.clone(),
            capabilities: config.effective_capabilities(),
            backend,
            discovery: Discovery::new(registry, config.service_id.clone()),
            http,
            forward_timeout,
            started: Instant::now(),
        }
    }

    /// Registered id of this node
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Current status report
    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            service_id: self.service_id.clone(),
            status: "online".to_string(),
            uptime: self.started.elapsed().as_secs(),
            capabilities: self.capabilities.clone(),
            backend: self.backend.as_ref().map(|(b, _)| b.id.clone()),
        }
    }

    /// Handle an envelope and normalize the outcome
    pub async fn handle(&self, envelope: MessageEnvelope, trace_id: Option<&str>) -> RelayResult {
        let message_id = envelope.message_id.clone();
        info!(
            message_id = %message_id,
            source_id = %envelope.source_id,
            target_id = envelope.target_id.as_deref().unwrap_or("-"),
            action = %envelope.content,
            "Received message"
        );

        match self.process(&envelope, trace_id).await {
            Ok(result) => RelayResult::success(message_id, result),
            Err(e) => {
                warn!(message_id = %message_id, code = e.code(), "Message failed: {}", e);
                RelayResult::failure(message_id, &e)
            }
        }
    }

    /// Wrap a generate request into an envelope and handle it
    pub async fn generate(&self, request: GenerateText, trace_id: Option<&str>) -> RelayResult {
        let envelope =
            MessageEnvelope::new(self.service_id.clone(), None, Action::GenerateText(request));
        self.handle(envelope, trace_id).await
    }

    async fn process(&self, envelope: &MessageEnvelope, trace_id: Option<&str>) -> Result<Value> {
        let action = &envelope.content;
        action.validate()?;

        if matches!(action, Action::GetStatus) {
            return Ok(serde_json::to_value(self.status())?);
        }

        if let Some((backend, transport)) = self.backend.as_ref().filter(|(_, t)| t.supports(action)) {
            info!("Forwarding {} to backend {}", action, backend.id);
            let forwarded = envelope.readdressed(&self.service_id, &backend.id);
            return transport.forward(&forwarded, trace_id).await;
        }

        // Addressed to this node: never relay further
        let target = match envelope.target_id.as_deref() {
            Some(id) if id == self.service_id => {
                return Err(Error::routing(format!(
                    "No local backend serves {action} on {}",
                    self.service_id
                )));
            }
            Some(id) => self.discovery.resolve(id, action.name(), trace_id).await?,
            None => self.discovery.discover(action.name(), trace_id).await?,
        };

        info!("Forwarding {} to {} at {}", action, target.service_id, target.address);
        let forwarded = envelope.readdressed(&self.service_id, &target.service_id);
        self.transport_for(&target).forward(&forwarded, trace_id).await
    }

    fn transport_for(&self, target: &Target) -> Box<dyn Transport> {
        let http = self.http.clone();
        match target.kind {
            TargetKind::Rest => Box::new(RestTransport::new(&target.address, http, self.forward_timeout)),
            TargetKind::Graphql => {
                Box::new(GraphqlTransport::new(&target.address, http, self.forward_timeout))
            }
            TargetKind::Peer => Box::new(PeerTransport::new(&target.address, http, self.forward_timeout)),
        }
    }
}
