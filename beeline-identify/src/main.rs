//! beeline-identify CLI
//!
//! Identify the plant in a photo and optionally pin it to the map.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use beeline_common::config::BeelineConfig;
use beeline_identify::{enrich_all, BeelineClient, IdentifyError, TaxonomyClient, VisionClient};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "beeline-identify")]
#[command(about = "Identify a plant photo and pin it to the BeeLine map")]
#[command(version)]
struct Args {
    /// Photo of the plant (JPEG, PNG or WebP)
    image: PathBuf,

    /// Latitude of the sighting
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the sighting
    #[arg(long, allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Submit the chosen candidate as an observation
    #[arg(long, requires_all = ["lat", "lng"])]
    pin: bool,

    /// Candidate to pin, 1-based
    #[arg(long, default_value_t = 1)]
    pick: usize,

    /// TOML config file
    #[arg(short, long, env = "BEELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Vision API key (overrides config)
    #[arg(long, env = "BEELINE_VISION_API_KEY")]
    api_key: Option<String>,

    /// BeeLine API base URL (overrides config)
    #[arg(long, env = "BEELINE_API_URL")]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,beeline_identify=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = BeelineConfig::load_or_default(args.config.as_deref()).identify;

    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let file_name = args
        .image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo.jpg".to_string());

    let vision = VisionClient::new(
        &config.vision_url,
        args.api_key.or(config.vision_api_key),
        config.max_candidates,
    )?;
    let candidates = match vision.identify(image, &file_name).await {
        Ok(candidates) if candidates.is_empty() => return Err(IdentifyError::NoCandidates.into()),
        Ok(candidates) => candidates,
        Err(e) => return Err(e).context("Plant identification failed"),
    };

    let taxonomy = TaxonomyClient::new(&config.taxonomy_url)?;
    let enriched = enrich_all(&taxonomy, candidates).await;

    for (i, candidate) in enriched.iter().enumerate() {
        println!(
            "{}. {} ({}) score {:.2}",
            i + 1,
            candidate.candidate.scientific_name,
            candidate.display_common_name().unwrap_or("no common name"),
            candidate.candidate.score
        );
        if let Some(url) = candidate.enrichment.as_ref().and_then(|e| e.wikipedia_url.as_deref()) {
            println!("   {}", url);
        }
    }

    if !args.pin {
        return Ok(());
    }

    let (Some(lat), Some(lng)) = (args.lat, args.lng) else {
        bail!("--pin needs --lat and --lng");
    };
    let Some(chosen) = args.pick.checked_sub(1).and_then(|i| enriched.get(i)) else {
        bail!("--pick must be between 1 and {}", enriched.len());
    };

    let api_url = args.api_url.unwrap_or(config.api_url);
    let client = BeelineClient::new(&api_url)?;
    let response = client
        .pin(&chosen.to_pin_request(lat, lng))
        .await
        .context("Failed to pin observation")?;

    info!(observation_id = %response.observation.id, "Pin complete");
    let friendly = match response.pollinator_friendly() {
        Some(true) => "pollinator-friendly",
        Some(false) => "not pollinator-friendly",
        None => "pollinator status unknown",
    };
    if response.duplicate {
        println!(
            "Already on the map nearby: {} ({})",
            response.observation.scientific_name, friendly
        );
    } else {
        println!(
            "Pinned {} at {:.5}, {:.5} ({})",
            response.observation.scientific_name, lat, lng, friendly
        );
    }

    Ok(())
}
