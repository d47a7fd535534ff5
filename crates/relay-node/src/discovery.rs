//! Target discovery through the service registry

use crate::error::{Error, Result};
use serde_json::json;
use service_registry::{ListFilter, RegistryClient, ServiceRecord, ServiceStatus, ServiceType};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// How a discovered service is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// REST capability endpoint
    Rest,
    /// GraphQL capability endpoint
    Graphql,
    /// Peer relay node
    Peer,
}

impl TargetKind {
    /// Transport for a registered service type; clients are never targets
    pub fn for_service_type(service_type: ServiceType) -> Option<Self> {
        match service_type {
            ServiceType::McpServer => Some(TargetKind::Peer),
            ServiceType::RestApi => Some(TargetKind::Rest),
            ServiceType::GraphqlApi => Some(TargetKind::Graphql),
            ServiceType::Client => None,
        }
    }
}

/// A resolved forwarding target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Registered id of the target
    pub service_id: String,
    /// Transport to use
    pub kind: TargetKind,
    /// Base URL of the target
    pub address: String,
}

impl Target {
    fn from_record(record: &ServiceRecord) -> Option<Self> {
        Some(Self {
            service_id: record.service_id.clone(),
            kind: TargetKind::for_service_type(record.service_type)?,
            address: record.address.clone(),
        })
    }
}

/// Whether `record` may receive traffic from the node `self_id`
fn eligible(record: &ServiceRecord, self_id: &str) -> bool {
    record.status == ServiceStatus::Healthy
        && record.service_id != self_id
        && TargetKind::for_service_type(record.service_type).is_some()
}

/// Most recently seen healthy candidate, smallest `service_id` on ties
pub fn select_target<'a>(candidates: &'a [ServiceRecord], self_id: &str) -> Option<&'a ServiceRecord> {
    candidates
        .iter()
        .filter(|r| eligible(r, self_id))
        .max_by(|a, b| match a.last_seen.cmp(&b.last_seen) {
            Ordering::Equal => b.service_id.cmp(&a.service_id),
            other => other,
        })
}

/// Resolves capabilities to targets for one relay node
#[derive(Debug, Clone)]
pub struct Discovery {
    registry: RegistryClient,
    self_id: String,
}

impl Discovery {
    /// Create a discovery handle for the node `self_id`
    pub fn new(registry: RegistryClient, self_id: impl Into<String>) -> Self {
        Self {
            registry,
            self_id: self_id.into(),
        }
    }

    /// Registry client used for lookups
    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Pick a live target serving `capability`
    pub async fn discover(&self, capability: &str, trace_id: Option<&str>) -> Result<Target> {
        let candidates = self.candidates(capability, trace_id).await?;

        select_target(&candidates, &self.self_id)
            .and_then(Target::from_record)
            .inspect(|t| debug!("Selected {} for {}", t.service_id, capability))
            .ok_or_else(|| {
                Error::routing(format!("No available service for capability {capability}"))
            })
    }

    /// Resolve an explicitly addressed target, which must be live and serve `capability`
    pub async fn resolve(
        &self,
        service_id: &str,
        capability: &str,
        trace_id: Option<&str>,
    ) -> Result<Target> {
        let candidates = self.candidates(capability, trace_id).await?;

        candidates
            .iter()
            .filter(|r| r.service_id == service_id && eligible(r, &self.self_id))
            .find_map(Target::from_record)
            .ok_or_else(|| {
                Error::routing(format!(
                    "Service {service_id} is not available for capability {capability}"
                ))
            })
    }

    async fn candidates(&self, capability: &str, trace_id: Option<&str>) -> Result<Vec<ServiceRecord>> {
        self.registry
            .list(&ListFilter::capability(capability), trace_id)
            .await
            .map_err(|e| {
                warn!("Registry lookup for {} failed: {}", capability, e);
                Error::Routing {
                    message: format!("No available service for capability {capability}"),
                    details: Some(json!({
                        "registry": self.registry.base_url(),
                        "reason": e.to_string(),
                    })),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use service_registry::RegistrationRequest;

    fn record(id: &str, age_secs: i64, status: ServiceStatus) -> ServiceRecord {
        let request = RegistrationRequest::new(
            id,
            ServiceType::McpServer,
            format!("http://{id}:8000"),
            ["generate_text"],
        )
        .with_status(status);
        ServiceRecord::from_registration(request, Utc::now() - Duration::seconds(age_secs))
    }

    #[test]
    fn test_selects_most_recently_seen() {
        let candidates = vec![
            record("relay-a", 20, ServiceStatus::Healthy),
            record("relay-b", 5, ServiceStatus::Healthy),
        ];
        let selected = select_target(&candidates, "relay-self").unwrap();
        assert_eq!(selected.service_id, "relay-b");
    }

    #[test]
    fn test_tie_breaks_on_smallest_id() {
        let now = Utc::now();
        let mut candidates = vec![
            record("relay-c", 0, ServiceStatus::Healthy),
            record("relay-a", 0, ServiceStatus::Healthy),
            record("relay-b", 0, ServiceStatus::Healthy),
        ];
        for c in &mut candidates {
            c.last_seen = now;
        }
        let selected = select_target(&candidates, "relay-self").unwrap();
        assert_eq!(selected.service_id, "relay-a");
    }

    #[test]
    fn test_skips_self_unhealthy_and_clients() {
        let mut client = record("browser", 0, ServiceStatus::Healthy);
        client.service_type = ServiceType::Client;

        let candidates = vec![
            record("relay-self", 0, ServiceStatus::Healthy),
            record("relay-a", 1, ServiceStatus::Unhealthy),
            record("relay-b", 2, ServiceStatus::Starting),
            client,
        ];
        assert!(select_target(&candidates, "relay-self").is_none());

        let candidates = vec![
            record("relay-self", 0, ServiceStatus::Healthy),
            record("relay-a", 30, ServiceStatus::Healthy),
        ];
        assert_eq!(
            select_target(&candidates, "relay-self").unwrap().service_id,
            "relay-a"
        );
    }

    #[test]
    fn test_target_kind_by_service_type() {
        assert_eq!(
            TargetKind::for_service_type(ServiceType::GraphqlApi),
            Some(TargetKind::Graphql)
        );
        assert_eq!(TargetKind::for_service_type(ServiceType::Client), None);
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_routing_error() {
        let client = RegistryClient::new("http://127.0.0.1:1", std::time::Duration::from_secs(1));
        let discovery = Discovery::new(client, "relay-self");

        let err = discovery.discover("generate_text", None).await.unwrap_err();
        assert_eq!(err.code(), "routing_error");
        assert!(err.details().is_some());
    }
}
