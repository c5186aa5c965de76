use clap::Subcommand;

use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::client::RemoteServices;

#[derive(Subcommand)]
pub enum OaiCommands {
    #[command(about = "Describe the OAI-PMH repository")]
    Identify,

    #[command(about = "List record identifiers (oai_datacite)")]
    List,
}

pub async fn handle(cmd: OaiCommands, remote: &RemoteServices, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        OaiCommands::Identify => {
            let identify = remote.identify().await?;
            match output_format {
                OutputFormat::Json => {
                    output_success(&output_format, "Identify", Some(serde_json::to_value(&identify)?))
                }
                OutputFormat::Text => {
                    println!("Repository: {}", identify.repository_name);
                    println!("Base URL: {}", identify.base_url);
                    println!("Protocol: {}", identify.protocol_version);
                    println!("Admin: {}", identify.admin_email);
                    println!("Earliest datestamp: {}", identify.earliest_datestamp);
                    Ok(())
                }
            }
        }
        OaiCommands::List => {
            let list = remote.list_identifiers().await?;
            if list.headers.is_empty() {
                return output_empty_collection(&output_format, "headers", "No records in repository");
            }
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                OutputFormat::Text => {
                    for header in &list.headers {
                        println!("{}\t{}", header.identifier, header.datestamp);
                    }
                }
            }
            Ok(())
        }
    }
}
