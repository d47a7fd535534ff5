//! Periodic liveness refresh against the registry

use service_registry::{Error as RegistryError, RegistrationRequest, RegistryClient, ServiceStatus};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background task marking this node healthy on a fixed interval
///
/// The first refresh fires immediately. Once the token is cancelled no
/// further refresh starts, and one already in flight is abandoned.
pub struct LivenessTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LivenessTask {
    /// Spawn the refresh loop for `registration`
    pub fn spawn(
        registry: RegistryClient,
        registration: RegistrationRequest,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    outcome = refresh(&registry, &registration) => {
                        if let Err(e) = outcome {
                            warn!(
                                "Liveness refresh of {} failed, continuing to serve: {}",
                                registration.service_id, e
                            );
                        }
                    }
                }
            }
            debug!("Liveness refresh of {} stopped", registration.service_id);
        });

        Self { cancel, handle }
    }

    /// Cancel the loop and wait for it to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!("Liveness task ended abnormally: {}", e);
        }
    }
}

/// Mark the node healthy, re-registering if the registry lost its record
async fn refresh(
    registry: &RegistryClient,
    registration: &RegistrationRequest,
) -> Result<(), RegistryError> {
    match registry
        .update_status(&registration.service_id, ServiceStatus::Healthy)
        .await
    {
        Ok(_) => {
            debug!("Refreshed liveness of {}", registration.service_id);
            Ok(())
        }
        Err(RegistryError::ServiceNotFound(_)) => {
            info!(
                "Registry has no record of {}, re-registering",
                registration.service_id
            );
            let request = registration.clone().with_status(ServiceStatus::Healthy);
            registry.register(&request).await.map(|_| ())
        }
        Err(e) => Err(e),
    }
}
