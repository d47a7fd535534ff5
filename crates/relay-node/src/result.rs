//! Normalized relay result
//!
//! Every relay answer has the same shape whatever the target spoke: REST,
//! GraphQL or the envelope protocol of a peer relay.

use crate::error::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform answer to a relayed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResult {
    /// Correlation id of the envelope this answers
    #[serde(default)]
    pub message_id: String,

    /// Whether the target produced a result
    pub success: bool,

    /// Error code, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Target's result, present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error message, present on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Diagnostic attached to a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RelayResult {
    /// Successful result
    pub fn success(message_id: impl Into<String>, result: Value) -> Self {
        Self {
            message_id: message_id.into(),
            success: true,
            code: None,
            result: Some(result),
            error: None,
            details: None,
        }
    }

    /// Failed result describing `error`
    pub fn failure(message_id: impl Into<String>, error: &Error) -> Self {
        Self {
            message_id: message_id.into(),
            success: false,
            code: Some(error.code().to_string()),
            result: None,
            error: Some(error.to_string()),
            details: error.details().cloned(),
        }
    }

    /// Turn a peer's answer back into a local outcome
    pub fn into_outcome(self) -> Result<Value, Error> {
        if self.success {
            return Ok(self.result.unwrap_or(Value::Null));
        }
        let code = self.code.unwrap_or_default();
        let error = self
            .error
            .unwrap_or_else(|| "peer relay reported a failure".to_string());
        Err(Error::from_code(&code, error, self.details))
    }

    /// HTTP status matching the result's code
    pub fn status_code(&self) -> StatusCode {
        match self.code.as_deref() {
            None => StatusCode::OK,
            Some("invalid_argument") => StatusCode::BAD_REQUEST,
            Some("not_found") => StatusCode::NOT_FOUND,
            Some("routing_error") => StatusCode::SERVICE_UNAVAILABLE,
            Some("upstream_error") => StatusCode::BAD_GATEWAY,
            Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayResult {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
