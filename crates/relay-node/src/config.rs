//! Configuration structures for a relay node

use crate::error::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use service_registry::ServiceType;
use std::path::Path;
use std::time::Duration;

/// Relay node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Identifier this node registers under
    #[serde(default = "default_service_id")]
    pub service_id: String,

    /// Service type advertised to the registry
    #[serde(default = "default_service_type")]
    pub service_type: ServiceType,

    /// Listen address (e.g., "0.0.0.0:8003")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// URL peers use to reach this node, `http://<bound address>` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_url: Option<String>,

    /// Base URL of the service registry
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Advertised capabilities, derived from the backend when empty
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Statically configured capability endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,

    /// Timeout of a single forward call
    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,

    /// Timeout of a single registry call
    #[serde(default = "default_registry_timeout_ms")]
    pub registry_timeout_ms: u64,

    /// Interval between liveness refreshes
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

/// A capability endpoint wired to this node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Identifier used as envelope target id
    pub id: String,
    /// Transport the endpoint speaks
    pub kind: BackendKind,
    /// Base URL of the endpoint
    pub url: String,
}

/// Transport of a capability endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// JSON over HTTP under `/api`
    Rest,
    /// GraphQL queries against `/graphql`
    Graphql,
}

impl BackendKind {
    /// Name used in configuration files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Rest => "rest",
            BackendKind::Graphql => "graphql",
        }
    }

    /// Actions an endpoint of this kind serves
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Rest => &["generate_text", "summarize", "analyze_data"],
            BackendKind::Graphql => &[
                "generate_text",
                "translate_text",
                "classify_text",
                "analyze_sentiment",
            ],
        }
    }
}

fn default_service_id() -> String {
    "relay-node".to_string()
}

fn default_service_type() -> ServiceType {
    ServiceType::McpServer
}

fn default_listen_addr() -> String {
    "0.0.0.0:8003".to_string()
}

fn default_registry_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_forward_timeout_ms() -> u64 {
    10_000
}

fn default_registry_timeout_ms() -> u64 {
    5_000
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            service_id: default_service_id(),
            service_type: default_service_type(),
            listen_addr: default_listen_addr(),
            advertise_url: None,
            registry_url: default_registry_url(),
            capabilities: Vec::new(),
            backend: None,
            forward_timeout_ms: default_forward_timeout_ms(),
            registry_timeout_ms: default_registry_timeout_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
            _ => Ok(serde_json::from_str(&contents)?),
        }
    }

    /// Capabilities advertised to the registry
    pub fn effective_capabilities(&self) -> Vec<String> {
        if !self.capabilities.is_empty() {
            return self.capabilities.clone();
        }
        self.backend
            .as_ref()
            .map(|b| b.kind.capabilities().iter().map(|c| c.to_string()).collect())
            .unwrap_or_default()
    }

    /// Forward call timeout
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    /// Registry call timeout
    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.registry_timeout_ms)
    }

    /// Liveness refresh interval
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_backend_kind_names_match_config_files() {
        for kind in BackendKind::value_variants() {
            let parsed = BackendKind::from_str(kind.as_str(), false).unwrap();
            assert_eq!(parsed, *kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
        assert!(BackendKind::from_str("soap", false).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.service_type, ServiceType::McpServer);
        assert_eq!(config.forward_timeout(), Duration::from_secs(10));
        assert_eq!(config.registry_timeout(), Duration::from_secs(5));
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert!(config.effective_capabilities().is_empty());
    }

    #[test]
    fn test_capabilities_follow_backend() {
        let config = RelayConfig {
            backend: Some(BackendConfig {
                id: "graphql-api".into(),
                kind: BackendKind::Graphql,
                url: "http://graphql:8002".into(),
            }),
            ..RelayConfig::default()
        };
        assert!(
            config
                .effective_capabilities()
                .contains(&"translate_text".to_string())
        );

        let config = RelayConfig {
            capabilities: vec!["generate_text".into()],
            ..config
        };
        assert_eq!(config.effective_capabilities(), vec!["generate_text"]);
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "service_id: relay-a\nbackend:\n  id: rest-api\n  kind: rest\n  url: http://rest:8001\nforward_timeout_ms: 250"
        )
        .unwrap();

        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.service_id, "relay-a");
        assert_eq!(config.backend.as_ref().unwrap().kind, BackendKind::Rest);
        assert_eq!(config.forward_timeout(), Duration::from_millis(250));
        assert_eq!(config.registry_url, "http://localhost:8000");
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"service_id": "relay-b", "service_type": "mcp-server"}}"#).unwrap();

        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.service_id, "relay-b");
        assert!(config.backend.is_none());
    }
}
