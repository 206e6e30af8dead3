//! Outbound pod apply
//!
//! The translated pod is upserted on the cluster keyed by its name, which is
//! derived from the deployment unit uuid.

use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::Client;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Create-or-update and delete of pods on the target cluster
#[async_trait]
pub trait PodApplier: Send + Sync {
    /// Create the pod or update it in place
    async fn apply(&self, pod: &Pod) -> Result<()>;

    /// Delete a pod; deleting a missing pod succeeds
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

fn pod_key(pod: &Pod) -> Result<(&str, &str)> {
    let name = pod.metadata.name.as_deref().ok_or(BridgeError::UnnamedPod)?;
    let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");
    Ok((namespace, name))
}

/// Applies pods through the Kubernetes API with server-side apply
pub struct KubeApplier {
    client: Client,
    field_manager: String,
}

impl KubeApplier {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    /// Connect using in-cluster config or the local kubeconfig
    pub async fn try_default(field_manager: impl Into<String>) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, field_manager))
    }
}

#[async_trait]
impl PodApplier for KubeApplier {
    async fn apply(&self, pod: &Pod) -> Result<()> {
        let (namespace, name) = pod_key(pod)?;
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let params = PatchParams::apply(&self.field_manager).force();
        api.patch(name, &params, &Patch::Apply(pod)).await?;

        debug!(pod = %name, namespace = %namespace, "Applied pod");
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!(pod = %name, namespace = %namespace, "Pod already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps applied pods in memory instead of calling a cluster
///
/// Used for dry runs and in tests.
#[derive(Default)]
pub struct RecordingApplier {
    applied: Mutex<Vec<Pod>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl RecordingApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pods applied so far, oldest first
    pub async fn applied(&self) -> Vec<Pod> {
        self.applied.lock().await.clone()
    }

    /// `(namespace, name)` pairs deleted so far
    pub async fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl PodApplier for RecordingApplier {
    async fn apply(&self, pod: &Pod) -> Result<()> {
        let (namespace, name) = pod_key(pod)?;
        info!(pod = %name, namespace = %namespace, "Dry run: would apply pod");

        self.applied.lock().await.push(pod.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        info!(pod = %name, namespace = %namespace, "Dry run: would delete pod");

        self.deleted
            .lock()
            .await
            .push((namespace.to_string(), name.to_string()));
        Ok(())
    }
}
