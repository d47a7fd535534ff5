//! Request trace ids
//!
//! Every request handled by a registry or relay node runs inside a span
//! carrying an `X-Trace-ID`. The id is taken from the request header when the
//! caller supplies one, generated otherwise, and echoed on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Header carrying the trace id
pub static TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Trace id of the current request, available as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a fresh trace id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Trace id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware attaching a [`TraceId`] and a request span
pub async fn propagate_trace_id(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(&TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| TraceId(v.to_string()))
        .unwrap_or_else(TraceId::generate);

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!("request", trace_id = %trace_id.as_str(), %method, %path);

    request.extensions_mut().insert(trace_id.clone());

    async move {
        let started = Instant::now();
        let mut response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
        if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
            response.headers_mut().insert(TRACE_ID_HEADER.clone(), value);
        }
        response
    }
    .instrument(span)
    .await
}
