use clap::{Parser, Subcommand};
use enricher::models::DataType;
use enricher::registry::load_all;
use reqwest::Client;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "enricher-cli")]
#[command(about = "Enricher service CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a plugin directory and print what would be registered
    Validate {
        #[arg(short, long, default_value = "enrichers")]
        path: PathBuf,

        #[arg(short, long, default_value = "settings.json")]
        manifest_file: String,
    },

    /// Submit an enrichment request
    Submit {
        #[arg(short, long, default_value = "http://localhost:8080")]
        endpoint: String,

        #[arg(short = 'k', long, env = "ENRICHER_API_KEY")]
        api_key: String,

        #[arg(short, long)]
        webhook: String,

        #[arg(short, long)]
        data: String,

        /// URL, HASH, FILE or USERNAME
        #[arg(short = 't', long = "type")]
        data_type: DataType,
    },

    /// Check server health
    Health {
        #[arg(short, long, default_value = "http://localhost:8080")]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            path,
            manifest_file,
        } => {
            let index = load_all(&path, &manifest_file).await?;

            println!(
                "Loaded {} plugin(s) from {}",
                index.plugin_count(),
                path.display()
            );
            for (data_type, plugins) in index.by_type() {
                println!("{}:", data_type);
                for plugin in plugins {
                    println!(
                        "  - {} ({}, cache ttl {}s) -> {}",
                        plugin.name,
                        if plugin.enabled { "enabled" } else { "disabled" },
                        plugin.timeout_secs,
                        plugin.executable_path.display()
                    );
                }
            }
        }

        Commands::Submit {
            endpoint,
            api_key,
            webhook,
            data,
            data_type,
        } => {
            let response = Client::new()
                .post(format!("{}/enrichment", endpoint))
                .header("Authorization", api_key)
                .json(&json!({
                    "webhookUri": webhook,
                    "data": data,
                    "type": data_type,
                }))
                .send()
                .await?;

            println!("{}", response.status());
            println!("{}", response.text().await?);
        }

        Commands::Health { endpoint } => {
            let response = Client::new()
                .get(format!("{}/health", endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
