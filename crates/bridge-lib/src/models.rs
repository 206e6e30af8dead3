//! Source platform data model
//!
//! Field names follow the source platform's camelCase JSON so requests can
//! be deserialized straight off the event payload.

use crate::error::{BridgeError, Result};
use crate::labels::{ContainerRole, LabelValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unit of work: everything needed to build a single pod
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentSyncRequest {
    pub revision: String,
    pub deployment_unit_uuid: String,
    /// Ordered; order decides merge precedence for pod-level fields
    pub containers: Vec<Container>,
    pub networks: Vec<Network>,
    /// Empty means any node
    pub node_name: String,
    /// Target namespace; empty means the agent's configured default
    pub namespace: String,
}

impl DeploymentSyncRequest {
    /// Validate the request and derive each container's role
    ///
    /// Must be called once before [`crate::translate::translate`]; the
    /// engine itself assumes a non-empty container list and trusts the
    /// roles set here.
    pub fn normalize(mut self) -> Result<Self> {
        if self.containers.is_empty() {
            return Err(BridgeError::EmptyRequest(self.deployment_unit_uuid));
        }

        for container in &mut self.containers {
            container.role = ContainerRole::from_labels(&container.labels);
        }

        Ok(self)
    }

    /// Look up a network by id
    pub fn network(&self, id: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.id == id)
    }
}

/// A workload container within a deployment unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub name: String,
    pub uuid: String,
    pub image: String,
    pub labels: BTreeMap<String, LabelValue>,
    /// Read but never propagated; the pod restart policy is fixed
    pub restart_policy: Option<RestartPolicy>,
    pub primary_network_id: String,
    pub ipc_mode: String,
    pub pid_mode: String,
    pub privileged: bool,
    pub read_only: bool,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    /// `hostname:ip` entries
    pub extra_hosts: Vec<String>,
    /// `hostPath:containerPath[:mode]` entries, or bare anonymous paths
    pub data_volumes: Vec<String>,
    /// Mount path to presence flag
    pub tmpfs: BTreeMap<String, LabelValue>,
    pub entry_point: Vec<String>,
    pub command: Vec<String>,
    pub environment: BTreeMap<String, LabelValue>,
    pub working_dir: String,
    pub tty: bool,
    pub stdin_open: bool,
    /// Set by [`DeploymentSyncRequest::normalize`]
    #[serde(skip)]
    pub role: ContainerRole,
}

impl Container {
    pub fn is_primary(&self) -> bool {
        self.role == ContainerRole::Primary
    }

    /// Look up a string-valued label
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).and_then(LabelValue::as_str)
    }
}

/// Per-container restart policy override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestartPolicy {
    pub name: String,
    pub maximum_retry_count: i64,
}

/// A network a container may reference as its primary network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Network {
    pub id: String,
    pub kind: String,
}
