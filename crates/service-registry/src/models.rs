//! Data models for the service registry

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A registered service entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Unique service identifier, chosen by the registrant
    pub service_id: String,

    /// What kind of service this is
    pub service_type: ServiceType,

    /// Reachable base URL
    pub address: String,

    /// Named functions the service performs, used as discovery keys
    pub capabilities: BTreeSet<String>,

    /// Current health status
    pub status: ServiceStatus,

    /// Last registration, status update or heartbeat
    pub last_seen: DateTime<Utc>,
}

/// Kind of registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    /// A relay node speaking the envelope protocol
    McpServer,
    /// A REST capability endpoint
    RestApi,
    /// A GraphQL capability endpoint
    GraphqlApi,
    /// A client front-end
    Client,
}

/// Service health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Registered but not yet serving
    Starting,
    /// Serving and refreshing its liveness
    Healthy,
    /// Reported itself as failing
    Unhealthy,
    /// No information
    Unknown,
}

/// Registration request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Unique service identifier
    #[serde(default)]
    pub service_id: String,

    /// Kind of service
    pub service_type: ServiceType,

    /// Reachable base URL
    #[serde(default)]
    pub address: String,

    /// Advertised capabilities
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Initial status, `healthy` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
}

/// Status update request body
///
/// The status travels as a raw string so that values outside the closed set
/// surface as `InvalidArgument` rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Requested status
    pub status: String,
}

/// Filter applied to service listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only services advertising this capability
    pub capability: Option<String>,
    /// Only services of this type
    pub service_type: Option<ServiceType>,
}

/// Registry health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryHealth {
    /// Always "healthy" while the registry answers
    pub status: String,
    /// Name of the reporting service
    pub service: String,
    /// Number of records physically present
    pub services_count: usize,
}

/// Error body returned by the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable message
    pub error: String,
    /// Machine readable error code
    pub code: String,
}

impl ServiceRecord {
    /// Build a record from a registration request, stamped with `now`
    pub fn from_registration(request: RegistrationRequest, now: DateTime<Utc>) -> Self {
        Self {
            service_id: request.service_id,
            service_type: request.service_type,
            address: request.address,
            capabilities: request.capabilities.into_iter().collect(),
            status: request.status.unwrap_or(ServiceStatus::Healthy),
            last_seen: now,
        }
    }

    /// Check if the service advertises a capability
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether `last_seen` is within `window` of `now`
    pub fn is_live(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.signed_duration_since(self.last_seen) <= window
    }

    /// Check the record against a listing filter
    pub fn matches(&self, filter: &ListFilter) -> bool {
        let capability_ok = filter
            .capability
            .as_deref()
            .is_none_or(|c| self.has_capability(c));
        let type_ok = filter.service_type.is_none_or(|t| self.service_type == t);
        capability_ok && type_ok
    }
}

impl RegistrationRequest {
    /// Create a request for a service with the given capabilities
    pub fn new(
        service_id: impl Into<String>,
        service_type: ServiceType,
        address: impl Into<String>,
        capabilities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            service_type,
            address: address.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            status: None,
        }
    }

    /// Set the initial status
    pub fn with_status(mut self, status: ServiceStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl ListFilter {
    /// Filter on a capability
    pub fn capability(capability: impl Into<String>) -> Self {
        Self {
            capability: Some(capability.into()),
            service_type: None,
        }
    }

    /// Additionally filter on a service type
    pub fn with_service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = Some(service_type);
        self
    }
}

impl ServiceType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::McpServer => "mcp-server",
            ServiceType::RestApi => "rest-api",
            ServiceType::GraphqlApi => "graphql-api",
            ServiceType::Client => "client",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "mcp-server" => Ok(ServiceType::McpServer),
            "rest-api" => Ok(ServiceType::RestApi),
            "graphql-api" => Ok(ServiceType::GraphqlApi),
            "client" => Ok(ServiceType::Client),
            other => Err(crate::Error::invalid_argument(format!(
                "Invalid service type: {other}"
            ))),
        }
    }
}

impl ServiceStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Starting => "starting",
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Unhealthy => "unhealthy",
            ServiceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "starting" => Ok(ServiceStatus::Starting),
            "healthy" => Ok(ServiceStatus::Healthy),
            "unhealthy" => Ok(ServiceStatus::Unhealthy),
            "unknown" => Ok(ServiceStatus::Unknown),
            other => Err(crate::Error::invalid_argument(format!(
                "Invalid status: {other} (expected starting, healthy, unhealthy or unknown)"
            ))),
        }
    }
}
