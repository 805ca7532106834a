use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tripmap::{run, GeocoderConfig, PipelineConfig, RoutingBackend, RoutingConfig, DEFAULT_OUTPUT};

#[derive(Debug, Parser)]
#[command(version, about = "Plot a dated list of places on an interactive trip map.")]
struct Cli {
    /// CSV with `date` and `place` columns, and optionally `type` (flight/car)
    input: PathBuf,

    /// HTML file to write
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Add an animated marker with play/pause/restart controls
    #[arg(long)]
    animate: bool,

    /// Animation length in seconds
    #[arg(long, default_value_t = 15.0, requires = "animate")]
    duration: f64,

    /// Page title
    #[arg(long, default_value = "Trip Map")]
    title: String,

    /// OpenRouteService key; car legs use the free OSRM server without one
    #[arg(long, env = "ORS_API_KEY", hide_env_values = true)]
    ors_api_key: Option<String>,

    /// Minimum delay between geocoding requests, in milliseconds
    #[arg(long, default_value_t = 1500)]
    geocode_delay: u64,

    /// Log request details
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let animation_duration = Duration::try_from_secs_f64(self.duration)
            .with_context(|| format!("Invalid animation duration: {}", self.duration))?;

        Ok(PipelineConfig {
            input: self.input,
            output: self.output,
            title: self.title,
            animate: self.animate,
            animation_duration,
            geocoder: GeocoderConfig {
                min_delay: Duration::from_millis(self.geocode_delay),
                ..GeocoderConfig::default()
            },
            routing: RoutingConfig::default(),
            backend: RoutingBackend::from_api_key(self.ors_api_key),
        })
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "tripmap=debug" } else { "tripmap=info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.into_config()?;

    println!("🗺️  Trip Map");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input: {}", config.input.display());
    match &config.backend {
        RoutingBackend::Osrm => println!("🛣️  Car routes: OSRM (free)"),
        RoutingBackend::OpenRouteService { .. } => println!("🛣️  Car routes: OpenRouteService"),
    }

    let report = run(&config)
        .with_context(|| format!("Failed to build trip map from {}", config.input.display()))?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ {} locations, {} geocoded places", report.stats.markers, report.geocode_lookups);
    println!(
        "✓ {} segments ({} car routes, {} straight-line fallbacks)",
        report.stats.segments, report.stats.car_routes, report.stats.fallbacks
    );
    if config.animate {
        println!("✓ Animation added");
    }
    println!("\n✅ Map saved to: {}", report.output.display());
    println!("   Open this file in your web browser to view the trip map!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["tripmap", "trips.csv"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("trip_map.html"));
        assert!(!cli.animate);

        let config = Cli {
            ors_api_key: None,
            ..cli
        }
        .into_config()
        .unwrap();
        assert_eq!(config.backend, RoutingBackend::Osrm);
        assert_eq!(config.geocoder.min_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_cli_animation_and_key() {
        let cli = Cli::try_parse_from([
            "tripmap",
            "trips.csv",
            "out.html",
            "--animate",
            "--duration",
            "8",
            "--ors-api-key",
            "secret",
        ])
        .unwrap();
        let config = cli.into_config().unwrap();

        assert_eq!(config.output, PathBuf::from("out.html"));
        assert!(config.animate);
        assert_eq!(config.animation_duration, Duration::from_secs(8));
        assert_eq!(
            config.backend,
            RoutingBackend::OpenRouteService {
                api_key: "secret".to_string()
            }
        );
    }

    #[test]
    fn test_cli_duration_requires_animate() {
        assert!(Cli::try_parse_from(["tripmap", "trips.csv", "--duration", "5"]).is_err());
    }

    #[test]
    fn test_cli_requires_input() {
        assert!(Cli::try_parse_from(["tripmap"]).is_err());
    }
}
