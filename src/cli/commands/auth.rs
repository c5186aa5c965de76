use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::client::RemoteServices;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login and print a session token")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
    },
}

pub async fn handle(cmd: AuthCommands, mut remote: RemoteServices, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let session = remote.login(&email, &password).await?;
            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Logged in",
                    Some(json!({ "token": session.token, "user": session.user })),
                ),
                OutputFormat::Text => {
                    output_success(
                        &output_format,
                        &format!("Logged in as {} ({})", session.user.email, session.user.role.as_str()),
                        None,
                    )?;
                    // Only the token on stdout's last line so it can be captured
                    println!("{}", session.token);
                    Ok(())
                }
            }
        }
    }
}
