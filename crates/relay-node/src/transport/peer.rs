//! Peer relay nodes speaking the envelope protocol

use super::{Transport, send};
use crate::{
    error::{Error, Result},
    message::{Action, MessageEnvelope},
    result::RelayResult,
};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Relay node reached through `POST {address}/mcp/message`
#[derive(Debug, Clone)]
pub struct PeerTransport {
    endpoint: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl PeerTransport {
    /// Create a transport for the peer at `address`
    pub fn new(address: &str, http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/mcp/message", address.trim_end_matches('/')),
            http,
            timeout,
        }
    }
}

#[async_trait]
impl Transport for PeerTransport {
    fn supports(&self, action: &Action) -> bool {
        !matches!(action, Action::Unknown { .. })
    }

    async fn forward(&self, envelope: &MessageEnvelope, trace_id: Option<&str>) -> Result<Value> {
        debug!("Relaying {} to {}", envelope.message_id, self.endpoint);

        let builder = self.http.post(&self.endpoint).json(envelope);
        let (status, body) = send(builder, self.timeout, trace_id).await?;

        // Peers answer with a normalized result whatever the status code
        match serde_json::from_value::<RelayResult>(body.clone()) {
            Ok(result) => result.into_outcome(),
            Err(_) => Err(Error::upstream(
                format!("Peer returned status {} without a relay result", status.as_u16()),
                body,
            )),
        }
    }
}
