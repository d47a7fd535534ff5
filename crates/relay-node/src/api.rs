//! HTTP API handlers

use crate::{
    error::Error,
    message::{GenerateText, MessageEnvelope},
    relay::Relay,
    result::RelayResult,
};
use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use service_registry::{TraceId, trace::propagate_trace_id};
use std::sync::Arc;

/// Creates the relay node router
pub fn create_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/mcp/message", post(message_handler))
        .route("/mcp/generate", post(generate_handler))
        .route("/mcp/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(propagate_trace_id))
        .with_state(relay)
}

fn rejected(rejection: JsonRejection) -> RelayResult {
    RelayResult::failure(String::new(), &Error::invalid_argument(rejection.body_text()))
}

async fn message_handler(
    State(relay): State<Arc<Relay>>,
    Extension(trace_id): Extension<TraceId>,
    body: Result<Json<MessageEnvelope>, JsonRejection>,
) -> RelayResult {
    match body {
        Ok(Json(envelope)) => relay.handle(envelope, Some(trace_id.as_str())).await,
        Err(rejection) => rejected(rejection),
    }
}

async fn generate_handler(
    State(relay): State<Arc<Relay>>,
    Extension(trace_id): Extension<TraceId>,
    body: Result<Json<GenerateText>, JsonRejection>,
) -> RelayResult {
    match body {
        Ok(Json(request)) => relay.generate(request, Some(trace_id.as_str())).await,
        Err(rejection) => rejected(rejection),
    }
}

async fn status_handler(State(relay): State<Arc<Relay>>) -> impl IntoResponse {
    Json(relay.status())
}

async fn health_handler(State(relay): State<Arc<Relay>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": relay.service_id(),
    }))
}
