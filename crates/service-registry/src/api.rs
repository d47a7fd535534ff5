//! HTTP API handlers

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::{
    error::Error,
    models::{ErrorResponse, ListFilter, RegistrationRequest, ServiceType, StatusUpdate},
    registry::Registry,
    trace::propagate_trace_id,
};

/// Creates the registry router
pub fn create_router(registry: Registry) -> Router {
    Router::new()
        .route("/registry/health", get(health_handler))
        .route(
            "/registry/services",
            post(register_handler).get(list_handler),
        )
        .route(
            "/registry/services/:service_id",
            get(get_handler).delete(deregister_handler),
        )
        .route("/registry/services/:service_id/status", put(status_handler))
        .route(
            "/registry/services/:service_id/heartbeat",
            post(heartbeat_handler),
        )
        .layer(middleware::from_fn(propagate_trace_id))
        .with_state(registry)
}

/// Query parameters of the listing endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Capability filter, ignored when empty
    pub capability: Option<String>,
    /// Service type filter, ignored when empty
    pub service_type: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<ListFilter, Error> {
        let service_type = match self.service_type.filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<ServiceType>()?),
            None => None,
        };
        Ok(ListFilter {
            capability: self.capability.filter(|c| !c.is_empty()),
            service_type,
        })
    }
}

async fn health_handler(State(registry): State<Registry>) -> impl IntoResponse {
    Json(registry.health())
}

async fn register_handler(
    State(registry): State<Registry>,
    body: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| Error::invalid_argument(e.body_text()))?;
    let record = registry.register(request)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_handler(
    State(registry): State<Registry>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| Error::invalid_argument(e.body_text()))?;
    let filter = query.into_filter()?;
    Ok(Json(registry.list(&filter)))
}

async fn get_handler(
    State(registry): State<Registry>,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(registry.get(&service_id)?))
}

async fn deregister_handler(
    State(registry): State<Registry>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    registry.deregister(&service_id);
    Json(json!({
        "message": "Service deregistered successfully",
        "service_id": service_id,
    }))
}

async fn status_handler(
    State(registry): State<Registry>,
    Path(service_id): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = body.map_err(|e| Error::invalid_argument(e.body_text()))?;
    Ok(Json(registry.update_status(&service_id, &update.status)?))
}

async fn heartbeat_handler(
    State(registry): State<Registry>,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(registry.heartbeat(&service_id)?))
}

/// Registry error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        warn!("API error: {} - {}", status, self.0);

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        });
        (status, body).into_response()
    }
}
