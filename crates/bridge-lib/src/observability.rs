//! Observability infrastructure for the bridge
//!
//! Provides:
//! - Prometheus metrics (events by kind, translation latency, apply errors)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for translation latency (in seconds); translation is
/// in-memory so the interesting range is sub-millisecond
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<BridgeMetricsInner> = OnceLock::new();

struct BridgeMetricsInner {
    events_received: IntCounterVec,
    events_failed: IntCounterVec,
    events_in_flight: IntGauge,
    translations: IntCounter,
    translation_latency_seconds: Histogram,
    apply_errors: IntCounter,
}

impl BridgeMetricsInner {
    fn new() -> Self {
        Self {
            events_received: register_int_counter_vec!(
                "podbridge_events_received_total",
                "Events received from the source platform by event name",
                &["event"]
            )
            .expect("Failed to register events_received"),

            events_failed: register_int_counter_vec!(
                "podbridge_events_failed_total",
                "Events whose handler returned an error, by event name",
                &["event"]
            )
            .expect("Failed to register events_failed"),

            events_in_flight: register_int_gauge!(
                "podbridge_events_in_flight",
                "Events currently being handled"
            )
            .expect("Failed to register events_in_flight"),

            translations: register_int_counter!(
                "podbridge_translations_total",
                "Deployment units translated into pod specs"
            )
            .expect("Failed to register translations"),

            translation_latency_seconds: register_histogram!(
                "podbridge_translation_latency_seconds",
                "Time spent translating a deployment unit into a pod spec",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register translation_latency_seconds"),

            apply_errors: register_int_counter!(
                "podbridge_apply_errors_total",
                "Failed create, update or delete calls against the cluster"
            )
            .expect("Failed to register apply_errors"),
        }
    }
}

/// Bridge metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct BridgeMetrics {
    _private: (),
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(BridgeMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &BridgeMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_events_received(&self, event: &str) {
        self.inner().events_received.with_label_values(&[event]).inc();
    }

    pub fn inc_events_failed(&self, event: &str) {
        self.inner().events_failed.with_label_values(&[event]).inc();
    }

    /// Track an event entering (`+1`) or leaving (`-1`) a handler
    pub fn add_in_flight(&self, delta: i64) {
        self.inner().events_in_flight.add(delta);
    }

    /// Record one translation and how long it took
    pub fn observe_translation(&self, duration_secs: f64) {
        self.inner().translations.inc();
        self.inner().translation_latency_seconds.observe(duration_secs);
    }

    pub fn inc_apply_errors(&self) {
        self.inner().apply_errors.inc();
    }

    pub fn events_received(&self, event: &str) -> u64 {
        self.inner().events_received.with_label_values(&[event]).get()
    }

    pub fn translations(&self) -> u64 {
        self.inner().translations.get()
    }
}

/// Structured logger for bridge events
///
/// Consistent JSON-formatted records for syncs, removals and failures.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, worker_count: usize) {
        info!(
            event = "agent_startup",
            node = %self.node_name,
            version = %version,
            worker_count = worker_count,
            "Podbridge agent starting"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Podbridge agent shutting down"
        );
    }

    /// Log a deployment unit synced to the cluster
    pub fn log_pod_synced(
        &self,
        deployment_unit: &str,
        revision: &str,
        pod_name: &str,
        namespace: &str,
        containers: usize,
    ) {
        info!(
            event = "pod_synced",
            node = %self.node_name,
            deployment_unit = %deployment_unit,
            revision = %revision,
            pod_name = %pod_name,
            namespace = %namespace,
            containers = containers,
            "Synced deployment unit to pod"
        );
    }

    /// Log a deployment unit's pod removed from the cluster
    pub fn log_pod_removed(&self, deployment_unit: &str, pod_name: &str, namespace: &str) {
        info!(
            event = "pod_removed",
            node = %self.node_name,
            deployment_unit = %deployment_unit,
            pod_name = %pod_name,
            namespace = %namespace,
            "Removed pod for deployment unit"
        );
    }

    /// Log an event that has no handler
    pub fn log_event_ignored(&self, event_id: &str, event_name: &str) {
        info!(
            event = "event_ignored",
            node = %self.node_name,
            event_id = %event_id,
            event_name = %event_name,
            "Ignoring event with no handler"
        );
    }

    /// Log an event whose handler failed
    pub fn log_event_failed(&self, event_id: &str, event_name: &str, error: &str) {
        warn!(
            event = "event_failed",
            node = %self.node_name,
            event_id = %event_id,
            event_name = %event_name,
            error = %error,
            "Event handling failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_metrics_creation() {
        // Metrics live in the global registry, so assert on deltas only
        let metrics = BridgeMetrics::new();

        let before = metrics.events_received("test.event");
        metrics.inc_events_received("test.event");
        assert_eq!(metrics.events_received("test.event"), before + 1);

        let translations = metrics.translations();
        metrics.observe_translation(0.0001);
        assert!(metrics.translations() > translations);

        metrics.add_in_flight(1);
        metrics.add_in_flight(-1);
        metrics.inc_events_failed("test.event");
        metrics.inc_apply_errors();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-node");
        assert_eq!(logger.node_name, "test-node");
    }
}
