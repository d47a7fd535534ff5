//! In-memory store of service records
//!
//! A single `RwLock` guards the whole table, so every operation is atomic as
//! observed by readers. Listings apply the staleness window at read time;
//! explicit lookups by id do not.

use crate::{
    error::{Error, Result},
    models::*,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Thread-safe table of service records keyed by `service_id`
pub struct RegistryStore {
    /// Services storage
    services: RwLock<HashMap<String, ServiceRecord>>,
    /// Maximum age of `last_seen` for a record to appear in listings
    staleness_window: Duration,
}

impl RegistryStore {
    /// Create an empty store with the given staleness window
    pub fn new(staleness_window: Duration) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            staleness_window,
        }
    }

    /// Configured staleness window
    pub fn staleness_window(&self) -> Duration {
        self.staleness_window
    }

    /// Insert or overwrite a record as given
    pub fn put(&self, record: ServiceRecord) {
        debug!("Storing service record: {}", record.service_id);
        self.write().insert(record.service_id.clone(), record);
    }

    /// Get a record by id, ignoring staleness
    pub fn get(&self, service_id: &str) -> Result<ServiceRecord> {
        self.read()
            .get(service_id)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound(service_id.to_string()))
    }

    /// Remove a record, returning it if it was present
    pub fn remove(&self, service_id: &str) -> Option<ServiceRecord> {
        self.write().remove(service_id)
    }

    /// List live records matching `filter`, ordered by `service_id`
    pub fn list(&self, filter: &ListFilter) -> Vec<ServiceRecord> {
        self.list_at(filter, Utc::now())
    }

    /// List live records as seen at `now`
    pub fn list_at(&self, filter: &ListFilter, now: DateTime<Utc>) -> Vec<ServiceRecord> {
        let mut records: Vec<ServiceRecord> = self
            .read()
            .values()
            .filter(|r| r.is_live(now, self.staleness_window))
            .filter(|r| r.matches(filter))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        records
    }

    /// Set the status of a record and refresh its `last_seen`
    pub fn update_status(&self, service_id: &str, status: ServiceStatus) -> Result<ServiceRecord> {
        self.modify(service_id, |record| record.status = status)
    }

    /// Refresh `last_seen` without touching the status
    pub fn heartbeat(&self, service_id: &str) -> Result<ServiceRecord> {
        self.modify(service_id, |_| {})
    }

    /// Remove every record whose `last_seen` is before `cutoff`
    pub fn reap_stale(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let mut services = self.write();
        let stale: Vec<String> = services
            .values()
            .filter(|r| r.last_seen < cutoff)
            .map(|r| r.service_id.clone())
            .collect();
        for service_id in &stale {
            services.remove(service_id);
        }
        stale
    }

    /// Number of records physically present
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn modify(
        &self,
        service_id: &str,
        apply: impl FnOnce(&mut ServiceRecord),
    ) -> Result<ServiceRecord> {
        let mut services = self.write();
        let record = services
            .get_mut(service_id)
            .ok_or_else(|| Error::ServiceNotFound(service_id.to_string()))?;
        apply(record);
        record.last_seen = Utc::now();
        Ok(record.clone())
    }

    // A panic while holding the lock cannot leave a half-written record: every
    // mutation is a single insert, remove or field assignment.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ServiceRecord>> {
        self.services.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ServiceRecord>> {
        self.services.write().unwrap_or_else(PoisonError::into_inner)
    }
}
