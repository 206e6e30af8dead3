//! HTTP API: event intake, translation preview, health checks and metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bridge_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::BridgeMetrics,
    translate::pod_name,
    BridgeError, DeploymentSyncRequest, Event, EventRouter,
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: BridgeMetrics,
    pub router: EventRouter,
    /// Namespace for pods whose request names none
    pub namespace: String,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: BridgeMetrics,
        router: EventRouter,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            router,
            namespace: namespace.into(),
        }
    }
}

fn bad_request(message: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.to_string() })),
    )
        .into_response()
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Accept an event and hand it to the router
///
/// The handler runs in the background; its outcome shows up in logs and
/// metrics, not in this response.
async fn receive_event(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let event: Event = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => return bad_request(format!("invalid event: {}", e)),
    };

    let id = event.id.clone();
    let name = event.name.clone();
    state.router.spawn(event);

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "id": id,
            "name": name,
            "receivedAt": Utc::now(),
        })),
    )
        .into_response()
}

/// Translate a request and return the pod that would be applied
async fn translate(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: DeploymentSyncRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(format!("invalid deployment sync request: {}", e)),
    };
    if request.deployment_unit_uuid.is_empty() {
        return bad_request(BridgeError::MissingDeploymentUnit);
    }

    let name = pod_name(&request.deployment_unit_uuid);
    let namespace = if request.namespace.is_empty() {
        state.namespace.clone()
    } else {
        request.namespace.clone()
    };

    let start = Instant::now();
    match bridge_lib::translate_request(request) {
        Ok(translated) => {
            state
                .metrics
                .observe_translation(start.elapsed().as_secs_f64());
            Json(translated.into_pod(name, namespace)).into_response()
        }
        Err(e) => bad_request(e),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/v1/events", post(receive_event))
        .route("/v1/translate", post(translate))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
