//! Core service registry implementation

use crate::{
    error::{Error, Result},
    models::*,
    store::RegistryStore,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Registry service operations over an injected store
#[derive(Clone)]
pub struct Registry {
    store: Arc<RegistryStore>,
}

impl Registry {
    /// Create a registry over an existing store
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self { store }
    }

    /// Create a registry with a fresh store
    pub fn with_staleness_window(window: Duration) -> Self {
        Self::new(Arc::new(RegistryStore::new(window)))
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    /// Register or re-register a service, last write wins
    pub fn register(&self, request: RegistrationRequest) -> Result<ServiceRecord> {
        if request.service_id.trim().is_empty() {
            return Err(Error::invalid_argument("service_id cannot be empty"));
        }
        // Dot segments and control characters cannot be addressed as /registry/services/{id}
        if matches!(request.service_id.as_str(), "." | "..")
            || request.service_id.chars().any(char::is_control)
        {
            return Err(Error::invalid_argument(format!(
                "service_id {:?} is not addressable",
                request.service_id
            )));
        }
        if request.address.trim().is_empty() {
            return Err(Error::invalid_argument("address cannot be empty"));
        }

        let record = ServiceRecord::from_registration(request, Utc::now());
        info!(
            service_id = %record.service_id,
            service_type = %record.service_type,
            address = %record.address,
            "Registering service"
        );
        self.store.put(record.clone());
        Ok(record)
    }

    /// Remove a service; absent ids are not an error
    pub fn deregister(&self, service_id: &str) {
        match self.store.remove(service_id) {
            Some(_) => info!(service_id, "Deregistered service"),
            None => debug!(service_id, "Deregister for unknown service ignored"),
        }
    }

    /// Live services matching `filter`, ordered by id
    pub fn list(&self, filter: &ListFilter) -> Vec<ServiceRecord> {
        self.store.list(filter)
    }

    /// Get a service by id regardless of staleness
    pub fn get(&self, service_id: &str) -> Result<ServiceRecord> {
        self.store.get(service_id)
    }

    /// Update a service's status from its wire name
    pub fn update_status(&self, service_id: &str, status: &str) -> Result<ServiceRecord> {
        let status: ServiceStatus = status.parse()?;
        let record = self.store.update_status(service_id, status)?;
        debug!(service_id, %status, "Service status updated");
        Ok(record)
    }

    /// Refresh a service's `last_seen`
    pub fn heartbeat(&self, service_id: &str) -> Result<ServiceRecord> {
        self.store.heartbeat(service_id)
    }

    /// Registry health report
    pub fn health(&self) -> RegistryHealth {
        RegistryHealth {
            status: "healthy".to_string(),
            service: "registry-service".to_string(),
            services_count: self.store.len(),
        }
    }

    /// Remove records not seen for longer than `max_age`
    pub fn reap(&self, max_age: Duration) -> Vec<String> {
        let reaped = self.store.reap_stale(Utc::now() - max_age);
        for service_id in &reaped {
            warn!(service_id, "Reaped stale service");
        }
        reaped
    }

    /// Spawn a background task reaping stale records every `interval`
    pub fn spawn_reaper(
        &self,
        max_age: Duration,
        interval: StdDuration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.reap(max_age);
                    }
                }
            }
            debug!("Reaper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::with_staleness_window(Duration::seconds(90))
    }

    fn request(service_id: &str, address: &str) -> RegistrationRequest {
        RegistrationRequest::new(
            service_id,
            ServiceType::McpServer,
            address,
            ["generate_text"],
        )
    }

    #[test]
    fn test_register_requires_id_and_address() {
        let registry = registry();

        let err = registry.register(request("", "http://a")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = registry.register(request("relay-a", "  ")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        for id in [".", "..", "relay\na"] {
            let err = registry.register(request(id, "http://a")).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{id:?}");
        }

        assert!(registry.store().is_empty());
    }

    #[test]
    fn test_registry_operations() {
        let registry = registry();

        let stored = registry.register(request("relay-a", "http://a:8000")).unwrap();
        assert_eq!(stored.status, ServiceStatus::Healthy);

        let fetched = registry.get("relay-a").unwrap();
        assert_eq!(fetched, stored);

        let updated = registry.update_status("relay-a", "unhealthy").unwrap();
        assert_eq!(updated.status, ServiceStatus::Unhealthy);

        assert!(matches!(
            registry.update_status("relay-a", "online"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.update_status("missing", "healthy"),
            Err(Error::ServiceNotFound(_))
        ));

        registry.deregister("relay-a");
        registry.deregister("relay-a");
        assert!(registry.get("relay-a").is_err());
    }

    #[test]
    fn test_reregistration_overwrites() {
        let registry = registry();
        registry.register(request("relay-a", "http://first:8000")).unwrap();
        registry
            .register(request("relay-a", "http://second:8000").with_status(ServiceStatus::Starting))
            .unwrap();

        let record = registry.get("relay-a").unwrap();
        assert_eq!(record.address, "http://second:8000");
        assert_eq!(record.status, ServiceStatus::Starting);
        assert_eq!(registry.health().services_count, 1);
    }

    #[test]
    fn test_reap() {
        let registry = registry();
        registry.register(request("relay-a", "http://a:8000")).unwrap();

        let mut old = registry.get("relay-a").unwrap();
        old.service_id = "relay-old".to_string();
        old.last_seen = Utc::now() - Duration::minutes(30);
        registry.store().put(old);

        assert_eq!(registry.reap(Duration::minutes(10)), vec!["relay-old".to_string()]);
        assert!(registry.get("relay-a").is_ok());
    }

    #[tokio::test]
    async fn test_reaper_stops_on_cancel() {
        let registry = registry();
        let shutdown = CancellationToken::new();
        let handle = registry.spawn_reaper(
            Duration::minutes(10),
            StdDuration::from_millis(10),
            shutdown.clone(),
        );

        shutdown.cancel();
        tokio::time::timeout(StdDuration::from_secs(1), handle)
            .await
            .expect("reaper did not stop")
            .unwrap();
    }
}
