use clap::Subcommand;

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Store a bearer token issued by the auth provider")]
    SetToken {
        #[arg(help = "JWT to store")]
        token: String,
    },

    #[command(about = "Show the authenticated user and shop")]
    Status,

    #[command(about = "Forget the stored token")]
    Clear,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::SetToken { token } => {
            let mut env_config = load_environment_config()?;
            env_config.token = Some(token);
            save_environment_config(&env_config)?;
            println!("Token stored");
            Ok(())
        }

        AuthCommands::Status => {
            if bearer_token()?.is_none() {
                anyhow::bail!("No token stored; run `ink auth set-token <jwt>`");
            }
            let body = api_get("/api/auth/whoami").await?;
            print_value(&output_format, &body)?;
            Ok(())
        }

        AuthCommands::Clear => {
            let mut env_config = load_environment_config()?;
            env_config.token = None;
            save_environment_config(&env_config)?;
            println!("Token cleared");
            Ok(())
        }
    }
}
