pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::RemoteServices;
use crate::config::ClientConfig;

#[derive(Parser)]
#[command(name = "cenoteando")]
#[command(about = "Cenoteando CLI - Browse and exchange catalogue data over the REST and OAI-PMH APIs")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "API base URL (defaults to CENOTEANDO_API_URL or http://localhost)")]
    pub url: Option<String>,

    #[arg(long, global = true, help = "Session token (defaults to CENOTEANDO_TOKEN)")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "OAI-PMH repository queries")]
    Oai {
        #[command(subcommand)]
        cmd: commands::oai::OaiCommands,
    },

    #[command(about = "Read catalogue entities")]
    Data {
        #[command(subcommand)]
        cmd: commands::data::DataCommands,
    },

    #[command(about = "CSV export and import")]
    Csv {
        #[command(subcommand)]
        cmd: commands::csv::CsvCommands,
    },

    #[command(about = "Frontend route table")]
    Route {
        #[command(subcommand)]
        cmd: commands::route::RouteCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Client settings from the environment, with `--url` taking precedence
pub fn client_config(cli: &Cli) -> ClientConfig {
    let mut config = crate::config::config().client.clone();
    if let Some(url) = &cli.url {
        config.api_base_url = url.clone();
    }
    config
}

fn remote(config: &ClientConfig, token: Option<String>) -> anyhow::Result<RemoteServices> {
    let remote = RemoteServices::new(config)?;
    Ok(match token {
        Some(token) if !token.is_empty() => remote.with_token(token),
        _ => remote,
    })
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = client_config(&cli);
    let token = cli.token.clone().or_else(|| std::env::var("CENOTEANDO_TOKEN").ok());

    match cli.command {
        Commands::Route { cmd } => commands::route::handle(cmd, &config.app_name, output_format),
        Commands::Auth { cmd } => commands::auth::handle(cmd, remote(&config, token)?, output_format).await,
        Commands::Oai { cmd } => commands::oai::handle(cmd, &remote(&config, token)?, output_format).await,
        Commands::Data { cmd } => commands::data::handle(cmd, &remote(&config, token)?, output_format).await,
        Commands::Csv { cmd } => commands::csv::handle(cmd, &remote(&config, token)?, output_format).await,
    }
}
