//! Podbridge CLI
//!
//! A command-line tool for previewing deployment unit translations,
//! sending events to an agent and checking agent health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use bridge_lib::events::DEPLOYMENT_UNIT_SYNC;
use clap::{Parser, Subcommand};
use commands::{agent, translate};
use std::path::PathBuf;

/// Podbridge CLI
#[derive(Parser)]
#[command(name = "podbridge")]
#[command(author, version, about = "CLI for the podbridge deployment unit translator", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via PODBRIDGE_AGENT_URL or the config file)
    #[arg(long, env = "PODBRIDGE_AGENT_URL")]
    pub agent_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a deployment sync request (JSON file, `-` for stdin) into a pod
    Translate {
        /// Request file
        file: PathBuf,

        /// Namespace when the request names none (sent to the agent with --remote)
        #[arg(long, short)]
        namespace: Option<String>,

        /// Let the agent translate instead of translating locally
        #[arg(long)]
        remote: bool,
    },

    /// Send a request to the agent wrapped in an event
    Send {
        /// Request file
        file: PathBuf,

        /// Event name (instance.start, deploymentunit.sync, deploymentunit.remove)
        #[arg(long, short, default_value = DEPLOYMENT_UNIT_SYNC)]
        event: String,
    },

    /// Show agent health
    Status,

    /// Show or change CLI defaults
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Store new defaults
    Set {
        /// Agent URL
        #[arg(long)]
        agent_url: Option<String>,

        /// Default namespace for local translations
        #[arg(long)]
        namespace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let agent_url = config.agent_url(cli.agent_url.as_deref());

    match cli.command {
        Commands::Translate {
            file,
            namespace,
            remote,
        } => {
            let client = if remote {
                Some(client::ApiClient::new(&agent_url)?)
            } else {
                None
            };
            let namespace = namespace.or_else(|| config.default_namespace.clone());
            translate::translate(client.as_ref(), &file, namespace.as_deref(), cli.format)
                .await?;
        }
        Commands::Send { file, event } => {
            let client = client::ApiClient::new(&agent_url)?;
            translate::send_event(&client, &file, &event, cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&agent_url)?;
            agent::show_status(&client, cli.format).await?;
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => agent::show_config(cli.format)?,
            ConfigCommands::Set {
                agent_url,
                namespace,
            } => agent::set_config(agent_url, namespace)?,
        },
    }

    Ok(())
}
