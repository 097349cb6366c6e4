use clap::Subcommand;
use serde_json::Value;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::types::PipelineStage;

#[derive(Subcommand)]
pub enum ShopCommands {
    #[command(about = "Show the current shop")]
    Current,

    #[command(about = "Print the pipeline board grouped by stage")]
    Board,

    #[command(about = "Show dashboard aggregates")]
    Dashboard,
}

pub async fn handle(cmd: ShopCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ShopCommands::Current => {
            let body = api_get("/api/shop").await?;
            print_value(&output_format, &body)?;
            Ok(())
        }

        ShopCommands::Board => {
            let body = api_get("/api/clients").await?;
            let clients = body
                .get("data")
                .and_then(|d| d.as_array())
                .cloned()
                .unwrap_or_default();

            match output_format {
                OutputFormat::Json => print_value(&output_format, &body)?,
                OutputFormat::Text => print_board(&clients),
            }
            Ok(())
        }

        ShopCommands::Dashboard => {
            let body = api_get("/api/dashboard").await?;
            print_value(&output_format, &body)?;
            Ok(())
        }
    }
}

fn print_board(clients: &[Value]) {
    for stage in PipelineStage::ALL {
        let cards: Vec<&Value> = clients
            .iter()
            .filter(|c| c.get("stage").and_then(|s| s.as_str()) == Some(stage.as_str()))
            .collect();

        println!("{} ({})", stage.as_str(), cards.len());
        for card in cards {
            let name = card.get("name").and_then(|n| n.as_str()).unwrap_or("?");
            println!("  - {}", name);
        }
        println!();
    }
}
