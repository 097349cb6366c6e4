use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Register an API server")]
    Add {
        #[arg(help = "Server name")]
        name: String,
        #[arg(help = "Base URL, e.g. https://api.inkline.app")]
        url: String,
        #[arg(long, default_value = "", help = "Optional description")]
        description: String,
    },

    #[command(about = "List registered servers")]
    List,

    #[command(about = "Switch to a server")]
    Use {
        #[arg(help = "Server name")]
        name: String,
    },

    #[command(about = "Ping the current server's health endpoint")]
    Ping,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Add { name, url, description } => {
            let mut config = load_server_config()?;
            config.servers.insert(
                name.clone(),
                ServerInfo {
                    url,
                    description,
                    added_at: Utc::now(),
                },
            );
            save_server_config(&config)?;

            // First server becomes the current one automatically
            let mut env_config = load_environment_config()?;
            if env_config.current_server.is_none() {
                env_config.current_server = Some(name.clone());
                save_environment_config(&env_config)?;
            }

            println!("Added server '{}'", name);
            Ok(())
        }

        ServerCommands::List => {
            let config = load_server_config()?;
            let env_config = load_environment_config()?;

            if config.servers.is_empty() {
                println!("No servers configured; run `ink server add <name> <url>`");
                return Ok(());
            }

            match output_format {
                OutputFormat::Json => {
                    let servers: Vec<_> = config.servers.iter().map(|(name, info)| {
                        json!({
                            "name": name,
                            "url": info.url,
                            "description": info.description,
                            "added_at": info.added_at,
                            "current": env_config.current_server.as_ref() == Some(name)
                        })
                    }).collect();
                    println!("{}", serde_json::to_string_pretty(&json!({"servers": servers}))?);
                }
                OutputFormat::Text => {
                    println!("{:<15} {:<40} {}", "NAME", "URL", "DESCRIPTION");
                    println!("{}", "-".repeat(70));
                    for (name, info) in &config.servers {
                        let current_marker = if env_config.current_server.as_ref() == Some(name) { "*" } else { " " };
                        println!("{}{:<14} {:<40} {}", current_marker, name, info.url, info.description);
                    }
                }
            }
            Ok(())
        }

        ServerCommands::Use { name } => {
            let config = load_server_config()?;
            if !config.servers.contains_key(&name) {
                anyhow::bail!("Server '{}' not found in configuration", name);
            }

            let mut env_config = load_environment_config()?;
            env_config.current_server = Some(name.clone());
            save_environment_config(&env_config)?;

            println!("Using server '{}'", name);
            Ok(())
        }

        ServerCommands::Ping => {
            let body = api_get("/health").await?;
            print_value(&output_format, &body)?;
            Ok(())
        }
    }
}
