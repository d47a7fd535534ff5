//! HTTP client for the service registry

use crate::{
    error::{Error, Result},
    models::*,
    trace::TRACE_ID_HEADER,
};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Typed client for a remote registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Base URL of the registry (e.g., "http://localhost:8000")
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl RegistryClient {
    /// Create a client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new(), timeout)
    }

    /// Create a client sharing an existing connection pool
    pub fn with_http_client(
        base_url: impl Into<String>,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http,
            timeout,
        }
    }

    /// Base URL of the registry
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register or re-register a service
    pub async fn register(&self, request: &RegistrationRequest) -> Result<ServiceRecord> {
        debug!("Registering {} with {}", request.service_id, self.base_url);
        let builder = self.http.post(self.url("/registry/services")).json(request);
        self.send(builder, &request.service_id, None).await
    }

    /// Remove a service
    pub async fn deregister(&self, service_id: &str) -> Result<()> {
        let builder = self.http.delete(self.service_url(service_id, None)?);
        let _: serde_json::Value = self.send(builder, service_id, None).await?;
        Ok(())
    }

    /// List live services matching `filter`
    pub async fn list(&self, filter: &ListFilter, trace_id: Option<&str>) -> Result<Vec<ServiceRecord>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(capability) = filter.capability.as_deref() {
            query.push(("capability", capability));
        }
        if let Some(service_type) = filter.service_type {
            query.push(("service_type", service_type.as_str()));
        }
        let builder = self.http.get(self.url("/registry/services")).query(&query);
        self.send(builder, "", trace_id).await
    }

    /// Get a service by id
    pub async fn get(&self, service_id: &str) -> Result<ServiceRecord> {
        let builder = self.http.get(self.service_url(service_id, None)?);
        self.send(builder, service_id, None).await
    }

    /// Update a service's status
    pub async fn update_status(&self, service_id: &str, status: ServiceStatus) -> Result<ServiceRecord> {
        let body = StatusUpdate {
            status: status.as_str().to_string(),
        };
        let builder = self
            .http
            .put(self.service_url(service_id, Some("status"))?)
            .json(&body);
        self.send(builder, service_id, None).await
    }

    /// Refresh a service's `last_seen`
    pub async fn heartbeat(&self, service_id: &str) -> Result<ServiceRecord> {
        let builder = self
            .http
            .post(self.service_url(service_id, Some("heartbeat"))?);
        self.send(builder, service_id, None).await
    }

    /// Registry health report
    pub async fn health(&self) -> Result<RegistryHealth> {
        self.send(self.http.get(self.url("/registry/health")), "", None).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/registry/services/{service_id}[/{action}]` with the id escaped as one segment
    fn service_url(&self, service_id: &str, action: Option<&str>) -> Result<Url> {
        let invalid = || Error::invalid_argument(format!("Invalid registry URL: {}", self.base_url));
        let mut url = Url::parse(&self.url("/registry/services")).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push(service_id)
            .extend(action);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        service_id: &str,
        trace_id: Option<&str>,
    ) -> Result<T> {
        let mut builder = builder.timeout(self.timeout);
        if let Some(trace_id) = trace_id {
            builder = builder.header(TRACE_ID_HEADER.clone(), trace_id);
        }
        let response = builder.send().await?;
        Self::decode(response, service_id).await
    }

    async fn decode<T: DeserializeOwned>(response: Response, service_id: &str) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.clone());

        Err(match status {
            StatusCode::NOT_FOUND => Error::ServiceNotFound(service_id.to_string()),
            StatusCode::BAD_REQUEST => Error::InvalidArgument(
                message.trim_start_matches("Invalid argument: ").to_string(),
            ),
            _ => Error::UnexpectedStatus {
                status: status.as_u16(),
                body,
            },
        })
    }
}
