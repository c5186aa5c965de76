use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::client::{guard, resolve, Navigation, RequiredAuth};

#[derive(Subcommand)]
pub enum RouteCommands {
    #[command(about = "Resolve a frontend path and apply the navigation guard")]
    Check {
        #[arg(help = "Path, e.g. /cenote/abc or /admin")]
        path: String,
        #[arg(long, help = "Evaluate as an admin session")]
        admin: bool,
    },
}

pub fn handle(cmd: RouteCommands, app_name: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        RouteCommands::Check { path, admin } => {
            let found = resolve(&path).ok_or_else(|| anyhow::anyhow!("No route matches '{}'", path))?;
            let navigation = guard(found.route, admin);
            let target = match navigation {
                Navigation::Proceed => path.clone(),
                Navigation::Redirect(to) => to.to_string(),
            };
            let required = match found.route.required_auth {
                RequiredAuth::None => "none",
                RequiredAuth::Admin => "admin",
            };

            output_success(
                &output_format,
                &format!(
                    "{} -> {} \"{}\" (auth: {})",
                    path,
                    target,
                    found.route.title(app_name),
                    required
                ),
                Some(json!({
                    "route": found.route.name,
                    "title": found.route.title(app_name),
                    "required_auth": required,
                    "params": found.params,
                    "navigate_to": target,
                })),
            )
        }
    }
}
