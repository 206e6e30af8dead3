//! Deployment unit event handler

use super::{Event, EventHandler, EventKind};
use crate::apply::PodApplier;
use crate::error::{BridgeError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::DeploymentSyncRequest;
use crate::observability::{BridgeMetrics, StructuredLogger};
use crate::translate::{pod_name, translate};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Translates sync events into pods and applies them; deletes on remove
pub struct SyncHandler {
    applier: Arc<dyn PodApplier>,
    default_namespace: String,
    health: HealthRegistry,
    metrics: BridgeMetrics,
    logger: StructuredLogger,
}

impl SyncHandler {
    pub fn new(
        applier: Arc<dyn PodApplier>,
        default_namespace: impl Into<String>,
        health: HealthRegistry,
        metrics: BridgeMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            applier,
            default_namespace: default_namespace.into(),
            health,
            metrics,
            logger,
        }
    }

    fn namespace<'a>(&'a self, request: &'a DeploymentSyncRequest) -> &'a str {
        if request.namespace.is_empty() {
            &self.default_namespace
        } else {
            &request.namespace
        }
    }

    /// Translate the request and upsert its pod
    pub async fn sync(&self, request: DeploymentSyncRequest) -> Result<()> {
        if request.deployment_unit_uuid.is_empty() {
            return Err(BridgeError::MissingDeploymentUnit);
        }
        let request = request.normalize()?;

        let start = Instant::now();
        let translated = translate(&request);
        self.metrics
            .observe_translation(start.elapsed().as_secs_f64());

        let name = pod_name(&request.deployment_unit_uuid);
        let namespace = self.namespace(&request).to_string();
        let pod = translated.into_pod(name.clone(), namespace.clone());

        self.track(self.applier.apply(&pod).await).await?;

        self.logger.log_pod_synced(
            &request.deployment_unit_uuid,
            &request.revision,
            &name,
            &namespace,
            request.containers.len(),
        );
        Ok(())
    }

    /// Delete the pod backing the request's deployment unit
    pub async fn remove(&self, request: &DeploymentSyncRequest) -> Result<()> {
        if request.deployment_unit_uuid.is_empty() {
            return Err(BridgeError::MissingDeploymentUnit);
        }

        let name = pod_name(&request.deployment_unit_uuid);
        let namespace = self.namespace(request);

        self.track(self.applier.delete(namespace, &name).await)
            .await?;

        self.logger
            .log_pod_removed(&request.deployment_unit_uuid, &name, namespace);
        Ok(())
    }

    /// Reflect an apply outcome in metrics and applier health
    async fn track(&self, outcome: Result<()>) -> Result<()> {
        match &outcome {
            Ok(()) => self.health.set_healthy(components::APPLIER).await,
            Err(e) => {
                self.metrics.inc_apply_errors();
                self.health
                    .set_degraded(components::APPLIER, e.to_string())
                    .await;
            }
        }
        outcome
    }
}

fn payload(event: Event) -> Result<DeploymentSyncRequest> {
    event.data.ok_or(BridgeError::MissingEventData {
        id: event.id,
        name: event.name,
    })
}

#[async_trait]
impl EventHandler for SyncHandler {
    async fn handle(&self, event: Event) -> Result<()> {
        match event.kind() {
            EventKind::InstanceStart | EventKind::DeploymentUnitSync => {
                self.sync(payload(event)?).await
            }
            EventKind::DeploymentUnitRemove => self.remove(&payload(event)?).await,
            EventKind::ClusterRemove => {
                // Cluster-wide cleanup is owned by the cluster lifecycle
                info!(cluster = %event.resource_id, "Cluster removed, nothing to clean up");
                Ok(())
            }
            EventKind::Unknown(name) => {
                self.logger.log_event_ignored(&event.id, &name);
                Ok(())
            }
        }
    }
}
