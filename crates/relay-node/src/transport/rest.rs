//! REST capability endpoints

use super::{Transport, plain_outcome, send};
use crate::{
    error::{Error, Result},
    message::{Action, MessageEnvelope},
};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTP endpoint exposing `/api/generate`, `/api/summarize` and `/api/analyze`
#[derive(Debug, Clone)]
pub struct RestTransport {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl RestTransport {
    /// Create a transport for the endpoint at `base_url`
    pub fn new(base_url: &str, http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        }
    }

    fn path(action: &Action) -> Option<&'static str> {
        match action {
            Action::GenerateText(_) => Some("/api/generate"),
            Action::Summarize(_) => Some("/api/summarize"),
            Action::AnalyzeData(_) => Some("/api/analyze"),
            _ => None,
        }
    }
}

#[async_trait]
impl Transport for RestTransport {
    fn supports(&self, action: &Action) -> bool {
        Self::path(action).is_some()
    }

    async fn forward(&self, envelope: &MessageEnvelope, trace_id: Option<&str>) -> Result<Value> {
        let action = &envelope.content;
        let path = Self::path(action).ok_or_else(|| {
            Error::routing(format!("REST endpoint {} does not serve {action}", self.base_url))
        })?;

        let url = format!("{}{}", self.base_url, path);
        debug!("Forwarding {} to {}", envelope.message_id, url);

        let builder = self.http.post(url).json(&action.parameters()?);
        let (status, body) = send(builder, self.timeout, trace_id).await?;
        plain_outcome(status, body)
    }
}
