//! Inbound events from the source platform
//!
//! This module provides:
//! - The event envelope and the event names the bridge reacts to
//! - A router that runs handlers on a bounded worker pool, one event at a
//!   time per deployment unit
//! - The handler that translates and applies deployment units

mod handler;
mod router;


pub use handler::SyncHandler;
pub use router::{EventRouter, RouterConfig};

use crate::error::Result;
use crate::models::DeploymentSyncRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INSTANCE_START: &str = "instance.start";
pub const DEPLOYMENT_UNIT_SYNC: &str = "deploymentunit.sync";
pub const DEPLOYMENT_UNIT_REMOVE: &str = "deploymentunit.remove";
pub const CLUSTER_REMOVE: &str = "cluster.remove";

/// Metric label for event names the bridge does not handle
pub const UNKNOWN_EVENT: &str = "unknown";

/// Event kinds the bridge knows about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    InstanceStart,
    DeploymentUnitSync,
    DeploymentUnitRemove,
    ClusterRemove,
    Unknown(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            INSTANCE_START => EventKind::InstanceStart,
            DEPLOYMENT_UNIT_SYNC => EventKind::DeploymentUnitSync,
            DEPLOYMENT_UNIT_REMOVE => EventKind::DeploymentUnitRemove,
            CLUSTER_REMOVE => EventKind::ClusterRemove,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::InstanceStart => INSTANCE_START,
            EventKind::DeploymentUnitSync => DEPLOYMENT_UNIT_SYNC,
            EventKind::DeploymentUnitRemove => DEPLOYMENT_UNIT_REMOVE,
            EventKind::ClusterRemove => CLUSTER_REMOVE,
            EventKind::Unknown(name) => name,
        }
    }

    /// Metric label value; every unknown name shares one label
    pub fn metric_label(&self) -> &'static str {
        match self {
            EventKind::InstanceStart => INSTANCE_START,
            EventKind::DeploymentUnitSync => DEPLOYMENT_UNIT_SYNC,
            EventKind::DeploymentUnitRemove => DEPLOYMENT_UNIT_REMOVE,
            EventKind::ClusterRemove => CLUSTER_REMOVE,
            EventKind::Unknown(_) => UNKNOWN_EVENT,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event envelope as delivered by the source platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub resource_id: String,
    pub resource_type: String,
    /// Present on deployment unit sync and remove events
    pub data: Option<DeploymentSyncRequest>,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.name)
    }

    /// Key under which events are serialized
    ///
    /// Events for the same deployment unit never run concurrently. Events
    /// without a payload fall back to the resource id.
    pub fn unit_key(&self) -> &str {
        match &self.data {
            Some(request) if !request.deployment_unit_uuid.is_empty() => {
                &request.deployment_unit_uuid
            }
            _ => &self.resource_id,
        }
    }
}

/// Reacts to a single event
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> Result<()>;
}
