//! Relay node for the service mesh
//!
//! A relay node registers itself with the service registry, keeps its record
//! fresh, and answers client requests by forwarding a [`MessageEnvelope`] to a
//! capability endpoint or a peer relay. Whatever the target speaks (REST,
//! GraphQL or the envelope protocol) the caller gets a [`RelayResult`].
//!
//! # Example
//!
//! ```no_run
//! use relay_node::{RelayConfig, RelayServer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> relay_node::Result<()> {
//! let config = RelayConfig {
//!     service_id: "relay-a".to_string(),
//!     ..RelayConfig::default()
//! };
//! let server = RelayServer::bind(config).await?;
//! server.serve(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod intent;
pub mod liveness;
pub mod message;
pub mod relay;
pub mod result;
pub mod server;
pub mod transport;

pub use api::create_router;
pub use config::{BackendConfig, BackendKind, RelayConfig};
pub use discovery::{Discovery, Target, TargetKind, select_target};
pub use error::{Error, Result};
pub use intent::determine_action;
pub use liveness::LivenessTask;
pub use message::{Action, MessageEnvelope};
pub use relay::{NodeStatus, Relay};
pub use result::RelayResult;
pub use server::RelayServer;
pub use transport::Transport;
