use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use callejero_agents::{filter_nearby, GuideAgent, DEFAULT_SEARCH_RADIUS_METERS};
use callejero_observability::{init_tracing, AppMetrics};
use callejero_providers::{
    NominatimClient, OverpassClient, DEFAULT_GEOCODE_TIMEOUT, DEFAULT_NOMINATIM_BASE_URL,
    DEFAULT_OVERPASS_BASE_URL, DEFAULT_PLACES_TIMEOUT, DEFAULT_USER_AGENT,
};
use callejero_storage::MemoryStore;
use clap::{Parser, Subcommand};

type Agent = GuideAgent<NominatimClient, OverpassClient, MemoryStore>;

#[derive(Debug, Parser)]
#[command(name = "callejero")]
#[command(about = "Callejero place-finder CLI")]
struct Cli {
    #[arg(long, env = "CALLEJERO_NOMINATIM_URL", default_value = DEFAULT_NOMINATIM_BASE_URL)]
    nominatim_url: String,

    #[arg(long, env = "CALLEJERO_OVERPASS_URL", default_value = DEFAULT_OVERPASS_BASE_URL)]
    overpass_url: String,

    #[arg(long, env = "CALLEJERO_SEARCH_RADIUS_METERS", default_value_t = DEFAULT_SEARCH_RADIUS_METERS)]
    radius: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat loop. 'resumen' prints the session summary.
    Chat,
    /// Resolve a place name to coordinates and load its surroundings.
    Geocode { name: String },
    /// List places around a coordinate, nearest first.
    Places {
        lat: f64,
        lon: f64,
        #[arg(long)]
        radius: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("callejero_cli");
    let cli = Cli::parse();

    let agent = build_agent(&cli).context("failed to set up providers")?;

    match cli.command {
        Command::Chat => run_chat(agent).await?,
        Command::Geocode { name } => {
            match agent.geocode(&name).await {
                Ok(located) => {
                    let place_count = agent
                        .resolve_location(located.lat, located.lon, cli.radius)
                        .await;
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "latitude": located.lat,
                            "longitude": located.lon,
                            "address": located.display_name,
                            "place_count": place_count,
                        }))?
                    );
                }
                Err(error) => println!("{error}"),
            }
        }
        Command::Places { lat, lon, radius } => {
            let radius = radius.unwrap_or(cli.radius);
            agent.resolve_location(lat, lon, radius).await;
            let snapshot = agent.session_snapshot();
            let nearby = filter_nearby(lat, lon, radius, &snapshot.current_places);
            println!("{}", serde_json::to_string_pretty(&nearby)?);
        }
    }

    Ok(())
}

async fn run_chat(agent: Agent) -> Result<()> {
    println!("Callejero chat. Escribe 'salir' para terminar, 'resumen' para el resumen.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("salir") || message.eq_ignore_ascii_case("exit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        if message.eq_ignore_ascii_case("resumen") {
            println!("\n{}\n", agent.summarize());
            continue;
        }

        let reply = agent.interpret_query(message).await;
        println!("\n{}\n", reply.reply_text);
    }

    Ok(())
}

fn build_agent(cli: &Cli) -> Result<Agent> {
    let geocoder = Arc::new(NominatimClient::new(
        &cli.nominatim_url,
        DEFAULT_USER_AGENT,
        DEFAULT_GEOCODE_TIMEOUT,
    )?);
    let places = Arc::new(OverpassClient::new(
        &cli.overpass_url,
        DEFAULT_USER_AGENT,
        DEFAULT_PLACES_TIMEOUT,
    )?);

    Ok(GuideAgent::new(
        geocoder,
        places,
        Arc::new(MemoryStore::new()),
        AppMetrics::shared(),
        DEFAULT_GEOCODE_TIMEOUT,
        cli.radius,
    ))
}
