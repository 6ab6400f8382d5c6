use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use safepoint_agents::AssistAgent;
use safepoint_core::{classify, AssistQuery};
use safepoint_lookup::{PlaceLocator, PlacesConfig, RoutePlanner, RoutingConfig};
use safepoint_observability::{init_tracing, AppMetrics};
use safepoint_storage::QuotaStore;
use safepoint_synth::{GenerationConfig, ReplySynthesizer};

#[derive(Debug, Parser)]
#[command(name = "safepoint")]
#[command(about = "Safepoint Assist CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one query through the full assist pipeline.
    Ask {
        message: String,
        #[arg(long)]
        lat: Option<f64>,
        #[arg(long)]
        lon: Option<f64>,
    },
    /// Print the classifier verdict for a message without any lookups.
    Classify { message: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("safepoint_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Ask { message, lat, lon } => {
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(6))
                .timeout(Duration::from_secs(20))
                .build()
                .context("failed to build HTTP client")?;

            let agent = AssistAgent::new(
                places_config().map(|config| PlaceLocator::new(client.clone(), config)),
                routing_config().map(|config| RoutePlanner::new(client.clone(), config)),
                generation_config().map(|config| ReplySynthesizer::new(client.clone(), config)),
                QuotaStore::new(),
                AppMetrics::shared(),
            );

            let query = AssistQuery {
                message,
                latitude: lat,
                longitude: lon,
            };
            let reply = agent.handle("cli", query).await?;
            println!("{}", reply.text);
        }
        Command::Classify { message } => {
            let intent = classify(&message);
            println!("{}", serde_json::to_string_pretty(&intent)?);
        }
    }

    Ok(())
}

fn places_config() -> Option<PlacesConfig> {
    Some(PlacesConfig {
        api_key: env::var("SAFEPOINT_PLACES_API_KEY").ok()?,
        base_url: env::var("SAFEPOINT_PLACES_BASE_URL")
            .unwrap_or_else(|_| "https://api.geoapify.com".to_string()),
        lang: env::var("SAFEPOINT_PLACES_LANG").unwrap_or_else(|_| "en".to_string()),
    })
}

fn routing_config() -> Option<RoutingConfig> {
    Some(RoutingConfig {
        api_key: env::var("SAFEPOINT_ROUTING_API_KEY").ok()?,
        base_url: env::var("SAFEPOINT_ROUTING_BASE_URL")
            .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
    })
}

fn generation_config() -> Option<GenerationConfig> {
    Some(GenerationConfig {
        api_key: env::var("SAFEPOINT_GENERATION_API_KEY").ok()?,
        base_url: env::var("SAFEPOINT_GENERATION_BASE_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
        model: env::var("SAFEPOINT_GENERATION_MODEL")
            .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
    })
}
