//! Transports to capability endpoints and peer relays

pub mod graphql;
pub mod peer;
pub mod rest;

pub use graphql::GraphqlTransport;
pub use peer::PeerTransport;
pub use rest::RestTransport;

use crate::{
    config::{BackendConfig, BackendKind},
    error::{Error, Result},
    message::{Action, MessageEnvelope},
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use service_registry::TRACE_ID_HEADER;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A way of delivering an envelope's content to a target
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Whether the target can serve `action` over this transport
    fn supports(&self, action: &Action) -> bool;

    /// Forward the envelope in a single attempt and return the target's result
    async fn forward(&self, envelope: &MessageEnvelope, trace_id: Option<&str>) -> Result<Value>;
}

/// Build the transport for a statically configured backend
pub fn for_backend(
    backend: &BackendConfig,
    http: reqwest::Client,
    timeout: Duration,
) -> Arc<dyn Transport> {
    match backend.kind {
        BackendKind::Rest => Arc::new(RestTransport::new(&backend.url, http, timeout)),
        BackendKind::Graphql => Arc::new(GraphqlTransport::new(&backend.url, http, timeout)),
    }
}

/// Send a request with the forward timeout and trace id applied
///
/// Returns the status and the body, parsed as JSON when possible and as a
/// JSON string otherwise.
pub(crate) async fn send(
    builder: RequestBuilder,
    timeout: Duration,
    trace_id: Option<&str>,
) -> Result<(StatusCode, Value)> {
    let mut builder = builder.timeout(timeout);
    if let Some(trace_id) = trace_id {
        builder = builder.header(TRACE_ID_HEADER.clone(), trace_id);
    }

    let response = builder.send().await.map_err(|e| transport_error(e, timeout))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    debug!("Target answered {} ({} bytes)", status, text.len());

    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> Error {
    if error.is_timeout() {
        Error::upstream(
            format!("Target timed out after {}ms", timeout.as_millis()),
            error.to_string(),
        )
    } else {
        Error::upstream("Failed to reach target", error.to_string())
    }
}

/// Extract a well-formed error payload from a target's body
pub(crate) fn remote_error(body: &Value) -> Option<Error> {
    let object = body.as_object()?;
    let details = object.get("details").cloned();

    if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
        return Some(Error::Remote {
            error: value_text(error),
            details,
        });
    }
    // Framework-style `{"detail": ...}` bodies
    if let Some(detail) = object.get("detail") {
        return Some(Error::Remote {
            error: value_text(detail),
            details,
        });
    }
    None
}

/// Map a plain REST-style answer into an outcome
pub(crate) fn plain_outcome(status: StatusCode, body: Value) -> Result<Value> {
    if let Some(error) = remote_error(&body) {
        return Err(error);
    }
    if !status.is_success() {
        return Err(Error::upstream(
            format!("Target returned status {}", status.as_u16()),
            body,
        ));
    }
    Ok(body)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
