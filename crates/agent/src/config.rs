//! Agent configuration

use anyhow::{Context, Result};
use serde::Deserialize;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name from Kubernetes downward API
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for events, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Namespace for pods whose request names none
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Events handled concurrently
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Server-side apply field manager
    #[serde(default = "default_field_manager")]
    pub field_manager: String,

    /// Record pods in memory instead of applying them to a cluster
    #[serde(default)]
    pub dry_run: bool,

    /// How long shutdown waits for accepted events to finish
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_worker_count() -> usize {
    250
}

fn default_field_manager() -> String {
    "podbridge".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            namespace: default_namespace(),
            worker_count: default_worker_count(),
            field_manager: default_field_manager(),
            dry_run: false,
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `PODBRIDGE_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PODBRIDGE").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("Invalid PODBRIDGE_* configuration")
    }
}
