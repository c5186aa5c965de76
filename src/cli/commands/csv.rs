use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::client::RemoteServices;

#[derive(Subcommand)]
pub enum CsvCommands {
    #[command(about = "Export every visible document as CSV")]
    Export {
        #[arg(help = "Entity (cenotes, species, users, variables, references)")]
        entity: String,
        #[arg(long, short, help = "Output file path (stdout when omitted)")]
        output: Option<PathBuf>,
    },

    #[command(about = "Import a CSV file, merging rows by _key")]
    Import {
        #[arg(help = "Entity (species, references)")]
        entity: String,
        #[arg(help = "Input file path")]
        input: PathBuf,
    },
}

pub async fn handle(cmd: CsvCommands, remote: &RemoteServices, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CsvCommands::Export { entity, output } => {
            let csv = remote.export_csv(&entity).await?;
            match output {
                Some(path) => {
                    fs::write(&path, &csv).with_context(|| format!("failed to write {}", path.display()))?;
                    output_success(
                        &output_format,
                        &format!("Exported {} to {}", entity, path.display()),
                        Some(json!({ "path": path.display().to_string() })),
                    )
                }
                None => {
                    print!("{}", csv);
                    Ok(())
                }
            }
        }
        CsvCommands::Import { entity, input } => {
            let csv = fs::read_to_string(&input).with_context(|| format!("failed to read {}", input.display()))?;
            let imported = remote.import_csv(&entity, csv).await?;
            output_success(
                &output_format,
                &format!("Imported {} {} rows", imported.len(), entity),
                Some(json!({ "imported": imported.len() })),
            )
        }
    }
}
