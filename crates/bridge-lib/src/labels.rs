//! Well-known label and annotation keys shared with the source platform
//!
//! These strings are part of the wire contract on both sides and must
//! match exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pod label carrying the deployment unit revision
pub const REVISION_LABEL: &str = "io.rancher.revision";

/// Pod label carrying the deployment unit uuid; the upsert key on the cluster side
pub const DEPLOYMENT_UUID_LABEL: &str = "io.rancher.deployment.uuid";

/// Container label marking which launch config a container belongs to
pub const SERVICE_LAUNCH_CONFIG: &str = "io.rancher.service.launch.config";

/// Value of [`SERVICE_LAUNCH_CONFIG`] for the primary launch config
pub const SERVICE_PRIMARY_LAUNCH_CONFIG: &str = "io.rancher.service.primary.launch.config";

/// Suffix of the per-container identity annotation (`<name>/<suffix>`)
pub const CONTAINER_UUID_LABEL: &str = "io.rancher.container.uuid";

pub const HOST_AFFINITY_LABEL: &str = "io.rancher.scheduler.affinity:host_label";
pub const HOST_ANTI_AFFINITY_LABEL: &str = "io.rancher.scheduler.affinity:host_label_ne";
pub const HOST_SOFT_AFFINITY_LABEL: &str = "io.rancher.scheduler.affinity:host_label_soft";
pub const HOST_SOFT_ANTI_AFFINITY_LABEL: &str =
    "io.rancher.scheduler.affinity:host_label_soft_ne";

/// Network kind that means "share the node's network namespace"
pub const HOST_NETWORKING_KIND: &str = "dockerHost";

/// Container mode value that requests the node's IPC or PID namespace
pub const HOST_MODE: &str = "host";

/// A label value as sent by the source platform
///
/// Label maps mix plain strings with boolean flags under one dynamic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Bool(bool),
    String(String),
}

impl LabelValue {
    /// Borrow the value if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LabelValue::String(s) => Some(s),
            LabelValue::Bool(_) => None,
        }
    }

    /// Render the value as an annotation string
    pub fn as_annotation(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Bool(b) => write!(f, "{}", b),
            LabelValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for LabelValue {
    fn from(value: &str) -> Self {
        LabelValue::String(value.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(value: String) -> Self {
        LabelValue::String(value)
    }
}

impl From<bool> for LabelValue {
    fn from(value: bool) -> Self {
        LabelValue::Bool(value)
    }
}

/// Role of a container within its deployment unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRole {
    /// Container of the primary launch config; its labels describe the pod
    Primary,
    /// Any other container (sidekick)
    #[default]
    Sidecar,
}

impl ContainerRole {
    /// Derive the role from a container's label map
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a LabelValue)>,
    {
        let is_primary = labels.into_iter().any(|(key, value)| {
            key == SERVICE_LAUNCH_CONFIG && value.as_str() == Some(SERVICE_PRIMARY_LAUNCH_CONFIG)
        });

        if is_primary {
            ContainerRole::Primary
        } else {
            ContainerRole::Sidecar
        }
    }
}

/// Returns true for label keys that only drive role detection
pub fn is_marker_label(key: &str) -> bool {
    key == SERVICE_LAUNCH_CONFIG
}
