//! trailday is a CLI tool that plans a day around a hike.
//!
//! Every command works on a session database that carries data between steps:
//! 1. `scrape` (or `enter`) - Store the trail from a trail-detail page (or by hand)
//! 2. `generate` - Ask an LLM for an itinerary around the stored trail
//! 3. `places` - List the places mentioned in the itinerary
//! 4. `map` - Geocode those places and write numbered pins as GeoJSON
//! 5. `export` - Write the itinerary to a Markdown file

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use llm::builder::{LLMBackend, LLMBuilder};
use log::LevelFilter;
use url::Url;

use trailday::{
    Difficulty, ExtractPolicy, TrailRecord,
    compose::compose,
    config::resolve_api_key,
    constants::{DEFAULT_GEOCODER_URL, DEFAULT_MODEL, DEFAULT_SECRETS_PATH},
    enter_trail,
    generate::generate,
    geocode::{MapContext, NominatimGeocoder, map, rate_limiter},
    places::{render_places, session_places},
    scrape::{FetchConfig, Fetcher, scrape_trail},
};

/// A CLI tool to plan a day around a hike
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a trail-detail page and store the trail in the session
    Scrape {
        /// The trail-detail URL to scrape
        url: String,
        /// Path to the session database
        db: String,
        /// Total number of requests before giving up
        #[arg(long, short, default_value_t = 3)]
        attempts: u32,
        /// Accept trail pages from any host
        #[arg(long)]
        any_host: bool,
    },
    /// Enter trail details by hand when scraping is not possible
    Enter {
        /// Path to the session database
        db: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        length_km: Option<f64>,
        #[arg(long)]
        elevation_gain_m: Option<f64>,
        /// "easy", "moderate" or "hard"
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long, default_value = "")]
        description: String,
        /// Feature or tag of the trail (repeatable)
        #[arg(long = "feature")]
        features: Vec<String>,
    },
    /// Generate an itinerary around the stored trail using an LLM model
    Generate {
        /// Path to the session database
        db: String,
        /// URL of the LLM model to use, as backend://model
        #[arg(long, short, default_value = DEFAULT_MODEL)]
        model: String,
        /// Free-text preference (repeatable); the stored ones are reused when omitted
        #[arg(long = "prefer", short = 'p')]
        preferences: Vec<String>,
        /// Path to the file with a prompt template ({trail}, {preferences})
        #[arg(long)]
        prompt_file: Option<String>,
        /// Path to the TOML secrets file holding OPENAI_API_KEY
        #[arg(long, default_value = DEFAULT_SECRETS_PATH)]
        secrets: PathBuf,
    },
    /// List the places mentioned in the stored itinerary
    Places {
        /// Path to the session database
        db: String,
        /// What to do with unparseable lines: "lenient" (default) or "strict"
        #[arg(long, default_value = "lenient")]
        policy: ExtractPolicy,
    },
    /// Geocode the places of the itinerary and write map pins as GeoJSON
    Map {
        /// Path to the session database
        db: String,
        /// Path to the GeoJSON file to write
        output_file: String,
        /// What to do with unparseable lines: "lenient" (default) or "strict"
        #[arg(long, default_value = "lenient")]
        policy: ExtractPolicy,
        /// Nominatim-compatible search endpoint
        #[arg(long, default_value = DEFAULT_GEOCODER_URL)]
        geocoder_url: String,
        /// Rate limit: geocoding requests per minute
        #[arg(long, short = 'r', default_value_t = 60)]
        rpm: u32,
    },
    /// Write the stored itinerary to a Markdown file
    Export {
        /// Path to the session database
        db: String,
        /// Path to output file to write the itinerary to
        output_file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Scrape {
            url,
            db,
            attempts,
            any_host,
        } => handle_scrape_command(url, db, attempts, any_host).await,
        Command::Enter {
            db,
            name,
            location,
            length_km,
            elevation_gain_m,
            difficulty,
            description,
            features,
        } => {
            let trail = TrailRecord {
                length_km,
                elevation_gain_m,
                difficulty,
                description,
                features: features.into_iter().collect::<BTreeSet<_>>(),
                ..TrailRecord::new(name, location)
            };
            enter_trail(&db, trail)
        }
        Command::Generate {
            db,
            model,
            preferences,
            prompt_file,
            secrets,
        } => handle_generate_command(db, model, preferences, prompt_file, secrets).await,
        Command::Places { db, policy } => {
            let places = session_places(&db, policy)?;
            print!("{}", render_places(&places));
            Ok(())
        }
        Command::Map {
            db,
            output_file,
            policy,
            geocoder_url,
            rpm,
        } => handle_map_command(db, output_file, policy, geocoder_url, rpm).await,
        Command::Export { db, output_file } => compose(&db, &output_file).await,
    }
}

async fn handle_scrape_command(
    url: String,
    db: String,
    attempts: u32,
    any_host: bool,
) -> Result<()> {
    let mut config = FetchConfig {
        max_attempts: attempts,
        ..FetchConfig::default()
    };
    if any_host {
        config.allowed_hosts.clear();
    }

    let fetcher = Fetcher::with_reqwest(config)?;
    let trail = scrape_trail(&fetcher, &url, &db).await?;
    println!("{}", trail.to_bullets());
    Ok(())
}

async fn handle_generate_command(
    db: String,
    model: String,
    preferences: Vec<String>,
    prompt_file: Option<String>,
    secrets: PathBuf,
) -> Result<()> {
    let api_key = resolve_api_key(&secrets)?;

    let model_url = Url::parse(&model).map_err(|e| anyhow::anyhow!("Invalid model URL: {}", e))?;
    let llm_builder = LLMBuilder::new()
        .backend(
            LLMBackend::from_str(model_url.scheme())
                .map_err(|e| anyhow::anyhow!("Invalid LLM backend: {}", e))?,
        )
        .model(
            [
                model_url
                    .host_str()
                    .context("Specify model name as host URL.")?,
                model_url.username(),
            ]
            .iter()
            .filter(|x| !x.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(":"),
        )
        .api_key(api_key)
        .system(trailday::constants::SYSTEM_PROMPT)
        .temperature(0.7)
        .max_tokens(1500);

    let prompt_template = match prompt_file {
        Some(file) => {
            let content =
                fs::read_to_string(&file).context(format!("Failed to read prompt file: {file}"))?;
            Some(content)
        }
        None => None,
    };

    let itinerary = generate(&db, llm_builder, prompt_template.as_deref(), preferences).await?;
    println!("{itinerary}");
    Ok(())
}

async fn handle_map_command(
    db: String,
    output_file: String,
    policy: ExtractPolicy,
    geocoder_url: String,
    rpm: u32,
) -> Result<()> {
    let geocoder = NominatimGeocoder::new(&geocoder_url)?;
    let limiter = rate_limiter(Some(rpm));
    let ctx = MapContext {
        geocoder: &geocoder,
        rate_limiter: limiter.as_ref(),
    };

    let plan = map(&db, &output_file, policy, &ctx).await?;

    print!("{}", render_places(&plan.places));
    for place in plan.unresolved() {
        println!("(not on map) {}. {}", place.index, place.name);
    }
    Ok(())
}
