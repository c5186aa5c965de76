use clap::Subcommand;

use crate::cli::utils::output_documents;
use crate::cli::OutputFormat;
use crate::client::RemoteServices;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "List one page of an entity")]
    List {
        #[arg(help = "Entity (cenotes, species, users, variables, references)")]
        entity: String,
        #[arg(long, help = "Page size")]
        limit: Option<usize>,
        #[arg(long, help = "Continuation token from a previous page")]
        continuation_token: Option<String>,
        #[arg(long, help = "Follow continuation tokens until the last page")]
        all: bool,
    },

    #[command(about = "Get one document by key")]
    Get {
        #[arg(help = "Entity (cenotes, species, users, variables, references)")]
        entity: String,
        #[arg(help = "Document key")]
        key: String,
    },
}

pub async fn handle(cmd: DataCommands, remote: &RemoteServices, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DataCommands::List {
            entity,
            limit,
            continuation_token,
            all,
        } => {
            let mut documents = Vec::new();
            let mut token = continuation_token;
            loop {
                let page = remote.list(&entity, limit, token.as_deref()).await?;
                documents.extend(page.data);
                token = page.continuation_token;
                if !all || !page.has_more || token.is_none() {
                    break;
                }
            }
            if let (OutputFormat::Text, Some(token)) = (&output_format, &token) {
                eprintln!("More results: --continuation-token {}", token);
            }
            output_documents(&output_format, &entity, &documents)
        }
        DataCommands::Get { entity, key } => {
            let document = remote.get(&entity, &key).await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
    }
}
