//! In-memory service registry with an HTTP API
//!
//! Services register themselves under an id they choose, refresh their
//! liveness periodically, and discover each other by capability. The registry
//! is a best-effort directory: state lives in memory only, and records whose
//! `last_seen` falls outside the staleness window disappear from listings
//! while remaining reachable by explicit lookup.
//!
//! # Example
//!
//! ```no_run
//! use service_registry::{RegistryConfig, RegistryServer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> service_registry::Result<()> {
//! let server = RegistryServer::bind(RegistryConfig::default()).await?;
//! server.serve(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod server;
pub mod store;
pub mod trace;

pub use client::RegistryClient;
pub use config::{RegistryConfig, ServerConfig, StalenessConfig};
pub use error::{Error, Result};
pub use models::*;
pub use registry::Registry;
pub use server::RegistryServer;
pub use store::RegistryStore;
pub use trace::{TRACE_ID_HEADER, TraceId};

/// Re-export key types for convenience
pub mod prelude {
    pub use crate::{
        Error, ListFilter, RegistrationRequest, Registry, RegistryClient, Result, ServiceRecord,
        ServiceStatus, ServiceType,
    };
}
