//! Translation and event commands

use anyhow::{bail, Context, Result};
use bridge_lib::{
    events::{EventKind, DEPLOYMENT_UNIT_SYNC},
    translate::pod_name,
    DeploymentSyncRequest, Event,
};
use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use std::io::Read;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::config::DEFAULT_NAMESPACE;
use crate::output::{format_flag, format_list, print_info, print_json, print_success, print_table, OutputFormat};

/// Row for the pod overview table
#[derive(Debug, Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Row for the containers table
#[derive(Debug, Tabled)]
pub struct ContainerRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Image")]
    pub image: String,
    #[tabled(rename = "Command")]
    pub command: String,
    #[tabled(rename = "Mounts")]
    pub mounts: String,
    #[tabled(rename = "Privileged")]
    pub privileged: String,
}

/// Read a request from a JSON file, or stdin when `path` is `-`
pub fn read_request(path: &Path) -> Result<DeploymentSyncRequest> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read request from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    serde_json::from_str(&content).context("Failed to parse deployment sync request")
}

/// Translate locally into a named pod
pub fn translate_local(request: DeploymentSyncRequest, default_namespace: &str) -> Result<Pod> {
    if request.deployment_unit_uuid.is_empty() {
        bail!("deployment sync request is missing a deployment unit uuid");
    }

    let name = pod_name(&request.deployment_unit_uuid);
    let namespace = if request.namespace.is_empty() {
        default_namespace.to_string()
    } else {
        request.namespace.clone()
    };

    let translated = bridge_lib::translate_request(request)?;
    Ok(translated.into_pod(name, namespace))
}

/// Fill in the namespace of a request that names none
pub fn with_default_namespace(
    mut request: DeploymentSyncRequest,
    namespace: Option<&str>,
) -> DeploymentSyncRequest {
    if let Some(namespace) = namespace {
        if request.namespace.is_empty() {
            request.namespace = namespace.to_string();
        }
    }
    request
}

/// Translate a request file and print the resulting pod
///
/// With a client the agent does the translation; otherwise it runs in
/// process. Without a `namespace` the agent's default applies remotely and
/// `default` locally.
pub async fn translate(
    client: Option<&ApiClient>,
    path: &Path,
    namespace: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let request = with_default_namespace(read_request(path)?, namespace);

    let pod = match client {
        Some(client) => client.translate(&request).await?,
        None => translate_local(request, DEFAULT_NAMESPACE)?,
    };

    match format {
        OutputFormat::Json => print_json(&pod)?,
        OutputFormat::Table => {
            print_table(pod_fields(&pod));
            println!();
            print_table(container_rows(&pod));
        }
    }

    Ok(())
}

/// Wrap a request file in an event and send it to the agent
pub async fn send_event(
    client: &ApiClient,
    path: &Path,
    event_name: &str,
    format: OutputFormat,
) -> Result<()> {
    if let EventKind::Unknown(name) = EventKind::from_name(event_name) {
        bail!("unknown event {:?}", name);
    }

    let request = read_request(path)?;
    let event = Event {
        id: format!("cli-{}", Utc::now().timestamp_millis()),
        name: event_name.to_string(),
        resource_id: request.deployment_unit_uuid.clone(),
        resource_type: "deploymentUnit".to_string(),
        data: Some(request),
    };

    let accepted = client.send_event(&event).await?;

    match format {
        OutputFormat::Json => print_json(&accepted)?,
        OutputFormat::Table => {
            print_success(&format!("Event {} ({}) accepted", accepted.id, accepted.name));
            if event_name == DEPLOYMENT_UNIT_SYNC {
                print_info("The agent applies the pod in the background");
            }
        }
    }

    Ok(())
}

/// Pod-level overview
pub fn pod_fields(pod: &Pod) -> Vec<FieldRow> {
    let spec = pod.spec.clone().unwrap_or_default();
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    let volumes: Vec<String> = spec
        .volumes
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.name)
        .collect();
    let aliases: Vec<String> = spec
        .host_aliases
        .unwrap_or_default()
        .into_iter()
        .map(|alias| {
            format!(
                "{}={}",
                alias.hostnames.unwrap_or_default().join(" "),
                alias.ip.unwrap_or_default()
            )
        })
        .collect();
    let affinity = spec
        .affinity
        .and_then(|a| a.node_affinity)
        .map(|node| {
            let required = node
                .required_during_scheduling_ignored_during_execution
                .map(|s| s.node_selector_terms.len())
                .unwrap_or(0);
            let preferred = node
                .preferred_during_scheduling_ignored_during_execution
                .map(|p| p.len())
                .unwrap_or(0);
            format!("{} required, {} preferred", required, preferred)
        })
        .unwrap_or_else(|| "-".to_string());

    let text = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    vec![
        FieldRow { field: "Name", value: text(pod.metadata.name.clone()) },
        FieldRow { field: "Namespace", value: text(pod.metadata.namespace.clone()) },
        FieldRow {
            field: "Revision",
            value: text(labels.get(bridge_lib::labels::REVISION_LABEL).cloned()),
        },
        FieldRow { field: "Node", value: text(spec.node_name) },
        FieldRow { field: "Host network", value: format_flag(spec.host_network) },
        FieldRow { field: "Host IPC", value: format_flag(spec.host_ipc) },
        FieldRow { field: "Host PID", value: format_flag(spec.host_pid) },
        FieldRow { field: "Volumes", value: format_list(&volumes) },
        FieldRow { field: "Host aliases", value: format_list(&aliases) },
        FieldRow { field: "Node affinity", value: affinity },
        FieldRow { field: "Restart policy", value: text(spec.restart_policy) },
        FieldRow { field: "DNS policy", value: text(spec.dns_policy) },
    ]
}

pub fn container_rows(pod: &Pod) -> Vec<ContainerRow> {
    pod.spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .map(|c| {
            let command: Vec<String> = c
                .command
                .iter()
                .chain(c.args.iter())
                .flatten()
                .cloned()
                .collect();
            let mounts: Vec<String> = c
                .volume_mounts
                .iter()
                .flatten()
                .map(|m| {
                    if m.read_only.unwrap_or(false) {
                        format!("{} (ro)", m.mount_path)
                    } else {
                        m.mount_path.clone()
                    }
                })
                .collect();

            ContainerRow {
                name: c.name.clone(),
                image: c.image.clone().unwrap_or_default(),
                command: if command.is_empty() {
                    "-".to_string()
                } else {
                    command.join(" ")
                },
                mounts: format_list(&mounts),
                privileged: format_flag(
                    c.security_context.as_ref().and_then(|s| s.privileged),
                ),
            }
        })
        .collect()
}
