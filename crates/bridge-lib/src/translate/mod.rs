//! Deployment unit to pod translation
//!
//! Pure functions turning a [`DeploymentSyncRequest`] into pod labels,
//! annotations and a [`PodSpec`]:
//! - [`metadata`]: identity labels and flattened container annotations
//! - [`volumes`]: host-path and tmpfs volumes, per-container mounts
//! - [`security`]: privilege and capability settings
//! - [`host_aliases`]: `extra_hosts` entries
//! - [`affinity`]: scheduler labels to node affinity
//! - [`containers`]: per-container definitions
//!
//! Nothing here performs I/O or keeps state; calls can run on any number of
//! workers at once. The request must not be mutated while it is translated.

pub mod affinity;
pub mod containers;
pub mod host_aliases;
pub mod metadata;
pub mod security;
pub mod volumes;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::labels::{HOST_MODE, HOST_NETWORKING_KIND};
use crate::models::{Container, DeploymentSyncRequest};
use k8s_openapi::api::core::v1::{Affinity, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;

/// Pod restart policy; restarts are owned by the source platform
pub const RESTART_POLICY_NEVER: &str = "Never";

/// Pod DNS policy: inherit the node's resolver configuration
pub const DNS_POLICY_DEFAULT: &str = "Default";

const POD_NAME_PREFIX: &str = "du-";

/// Result of translating one deployment unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedPod {
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub spec: PodSpec,
}

impl TranslatedPod {
    /// Wrap the translation into a full Pod object
    pub fn into_pod(self, name: impl Into<String>, namespace: impl Into<String>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(namespace.into()),
                labels: Some(self.labels),
                annotations: Some(self.annotations),
                ..Default::default()
            },
            spec: Some(self.spec),
            status: None,
        }
    }
}

/// Name of the pod backing a deployment unit
pub fn pod_name(deployment_unit_uuid: &str) -> String {
    format!("{}{}", POD_NAME_PREFIX, deployment_unit_uuid.to_lowercase())
}

/// Translate a normalized request
///
/// Assumes [`DeploymentSyncRequest::normalize`] has run; use
/// [`translate_request`] at an input boundary.
pub fn translate(request: &DeploymentSyncRequest) -> TranslatedPod {
    TranslatedPod {
        labels: metadata::labels(request),
        annotations: metadata::annotations(&request.containers),
        spec: pod_spec(request),
    }
}

/// Validate, normalize and translate a raw request
pub fn translate_request(request: DeploymentSyncRequest) -> Result<TranslatedPod> {
    let request = request.normalize()?;
    Ok(translate(&request))
}

/// Assemble the pod spec
///
/// Host IPC, PID and network are OR-ed over containers: one container
/// asking for the host namespace is enough.
pub fn pod_spec(request: &DeploymentSyncRequest) -> PodSpec {
    let sources = &request.containers;

    let host_ipc = sources.iter().any(|c| c.ipc_mode == HOST_MODE);
    let host_pid = sources.iter().any(|c| c.pid_mode == HOST_MODE);
    let host_network = sources.iter().any(|c| uses_host_network(request, c));

    let volume_names = volumes::VolumeNames::new(request);
    let pod_volumes = volume_names.volumes();
    let aliases: Vec<_> = sources
        .iter()
        .flat_map(host_aliases::host_aliases)
        .collect();

    PodSpec {
        restart_policy: Some(RESTART_POLICY_NEVER.to_string()),
        dns_policy: Some(DNS_POLICY_DEFAULT.to_string()),
        host_ipc: host_ipc.then_some(true),
        host_pid: host_pid.then_some(true),
        host_network: host_network.then_some(true),
        node_name: (!request.node_name.is_empty()).then(|| request.node_name.clone()),
        containers: sources
            .iter()
            .map(|c| containers::container(c, &volume_names))
            .collect(),
        volumes: (!pod_volumes.is_empty()).then_some(pod_volumes),
        host_aliases: (!aliases.is_empty()).then_some(aliases),
        affinity: pod_affinity(sources),
        ..Default::default()
    }
}

fn uses_host_network(request: &DeploymentSyncRequest, container: &Container) -> bool {
    if container.primary_network_id.is_empty() {
        return false;
    }

    request
        .network(&container.primary_network_id)
        .is_some_and(|network| network.kind == HOST_NETWORKING_KIND)
}

/// The primary container's affinity, else the last container that has one
fn pod_affinity(containers: &[Container]) -> Option<Affinity> {
    containers
        .iter()
        .rev()
        .filter(|c| c.is_primary())
        .find_map(affinity::affinity)
        .or_else(|| containers.iter().rev().find_map(affinity::affinity))
}
