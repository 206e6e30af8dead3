//! Error types for the bridge boundary
//!
//! Translation itself never fails; these errors describe requests that are
//! rejected before translation and failures of the outbound apply step.

use thiserror::Error;

/// Errors surfaced by request validation, event handling and pod apply
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request carries no containers
    #[error("deployment unit {0:?} has no containers")]
    EmptyRequest(String),

    /// The request has no deployment unit identifier to key the pod on
    #[error("deployment sync request is missing a deployment unit uuid")]
    MissingDeploymentUnit,

    /// A sync or remove event arrived without its request payload
    #[error("event {name} ({id}) carries no deployment sync request")]
    MissingEventData { id: String, name: String },

    /// The event router was closed while the event waited for a worker
    #[error("event router is shut down")]
    RouterClosed,

    /// A pod reached the apply step without a name
    #[error("pod has no name")]
    UnnamedPod,

    /// The cluster API rejected a create, update or delete
    #[error("cluster API call failed: {0}")]
    Apply(#[from] kube::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
