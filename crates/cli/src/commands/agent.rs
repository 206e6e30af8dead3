//! Agent status and CLI configuration commands

use anyhow::Result;
use bridge_lib::{ComponentStatus, HealthResponse};
use chrono::DateTime;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{color_status, print_info, print_json, print_success, print_table, print_warning, OutputFormat};

/// Row for the component health table
#[derive(Debug, Tabled)]
pub struct ComponentRow {
    #[tabled(rename = "Component")]
    pub component: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Message")]
    pub message: String,
    #[tabled(rename = "Last Check")]
    pub last_check: String,
}

fn status_name(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "healthy",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "unhealthy",
    }
}

/// Components sorted by name
pub fn component_rows(health: &HealthResponse) -> Vec<ComponentRow> {
    let mut rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, component)| ComponentRow {
            component: name.clone(),
            status: color_status(status_name(component.status)),
            message: component.message.clone().unwrap_or_else(|| "-".to_string()),
            last_check: DateTime::from_timestamp(component.last_check_timestamp, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    rows.sort_by(|a, b| a.component.cmp(&b.component));
    rows
}

/// Show the agent's component health
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            let overall = status_name(health.status);
            if health.status == ComponentStatus::Healthy {
                print_success(&format!("Agent is {}", overall));
            } else {
                print_warning(&format!("Agent is {}", color_status(overall)));
            }
            print_table(component_rows(&health));
        }
    }

    Ok(())
}

pub fn show_config(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    match format {
        OutputFormat::Json => print_json(&config)?,
        OutputFormat::Table => {
            print_info(&format!("Config file: {}", Config::config_path()?.display()));
            println!("agent_url:         {}", config.agent_url(None));
            println!("default_namespace: {}", config.namespace(None));
        }
    }

    Ok(())
}

/// Update the stored defaults; unset arguments keep their current value
pub fn set_config(agent_url: Option<String>, namespace: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = agent_url {
        url::Url::parse(&url)?;
        config.agent_url = Some(url);
    }
    if let Some(namespace) = namespace {
        config.default_namespace = Some(namespace);
    }

    let path = config.save()?;
    print_success(&format!("Saved {}", path.display()));
    Ok(())
}
