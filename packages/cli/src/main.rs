#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for street intersection lookups.
//!
//! Resolves two street names to the coordinate where they cross and
//! prints the result as JSON, e.g.:
//!
//! ```text
//! patrol_map_cli "Av Lo Boza" "Avenida El Abrazo" --city Pudahuel
//! ```

use clap::Parser;
use patrol_map_intersect::{IntersectionResolver, ResolverConfig, StreetQuery};

#[derive(Parser)]
#[command(name = "patrol_map_cli", about = "Street intersection lookup")]
struct Cli {
    /// First street name (e.g., "Av Lo Boza")
    street_a: String,
    /// Second street name (e.g., "Avenida El Abrazo")
    street_b: String,
    /// City to search in (defaults to the configured municipality)
    #[arg(long)]
    city: Option<String>,
    /// Nearest node pair acceptance threshold in meters
    #[arg(long)]
    threshold: Option<f64>,
    /// Administrative area for topology queries (overrides the default)
    #[arg(long)]
    area: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();

    let mut config = ResolverConfig::default();
    if let Some(threshold) = cli.threshold {
        config.nearest_threshold_meters = threshold;
    }
    if let Some(area) = cli.area {
        config.area_name = area;
    }

    let resolver = IntersectionResolver::new(config)?;

    let found = resolver
        .resolve(
            &StreetQuery::new(&cli.street_a),
            &StreetQuery::new(&cli.street_b),
            cli.city.as_deref(),
        )
        .await;

    match found {
        Some(intersection) => {
            println!("{}", serde_json::to_string_pretty(&intersection)?);
            Ok(())
        }
        None => {
            log::warn!(
                "no intersection found for '{}' / '{}'",
                cli.street_a,
                cli.street_b
            );
            eprintln!("Intersection not found");
            std::process::exit(1);
        }
    }
}
