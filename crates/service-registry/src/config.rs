//! Configuration structures for service registry

use crate::error::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration as StdDuration;

/// Service registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Staleness and reaping policy
    #[serde(default)]
    pub staleness: StalenessConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Staleness policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessConfig {
    /// Records not seen for longer than this are hidden from listings
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Records not seen for longer than this are removed; never when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reap_after_secs: Option<u64>,
    /// How often the reaper runs
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

// Three missed 30 s liveness refreshes.
fn default_window_secs() -> u64 {
    90
}

fn default_reap_interval_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            reap_after_secs: None,
            reap_interval_secs: default_reap_interval_secs(),
        }
    }
}

fn seconds(field: &str, secs: u64) -> Result<Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| Error::invalid_argument(format!("{field} out of range: {secs}")))
}

impl StalenessConfig {
    /// Staleness window as a chrono duration
    pub fn window(&self) -> Result<Duration> {
        seconds("staleness.window_secs", self.window_secs)
    }

    /// Reap age, if reaping is enabled
    pub fn reap_after(&self) -> Result<Option<Duration>> {
        self.reap_after_secs
            .map(|secs| seconds("staleness.reap_after_secs", secs))
            .transpose()
    }

    /// Check that every duration is representable
    pub fn validate(&self) -> Result<()> {
        self.window()?;
        self.reap_after()?;
        Ok(())
    }

    /// Reaper tick interval
    pub fn reap_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.reap_interval_secs.max(1))
    }
}

impl RegistryConfig {
    /// Load configuration from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        // YAML by extension, JSON otherwise
        let config: Self = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };
        config.staleness.validate()?;
        Ok(config)
    }
}
