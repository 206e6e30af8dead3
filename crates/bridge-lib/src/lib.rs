//! Bridge library: deployment units to Kubernetes pods
//!
//! This crate provides the core functionality for:
//! - Translating a source platform deployment unit into a pod spec
//! - Routing inbound sync/remove events to handlers
//! - Applying translated pods to the target cluster
//! - Health checks and observability

pub mod apply;
pub mod error;
pub mod events;
pub mod health;
pub mod labels;
pub mod models;
pub mod observability;
pub mod translate;

pub use apply::{KubeApplier, PodApplier, RecordingApplier};
pub use error::{BridgeError, Result};
pub use events::{Event, EventHandler, EventKind, EventRouter, RouterConfig, SyncHandler};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use labels::{ContainerRole, LabelValue};
pub use models::*;
pub use observability::{BridgeMetrics, StructuredLogger};
pub use translate::{translate, translate_request, TranslatedPod};
