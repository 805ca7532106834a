// 🧭 Pipeline
// load → geocode → route → render → (animate) → write

use crate::animation::{inject_animation, Timeline, DEFAULT_DURATION};
use crate::error::Result;
use crate::geocode::{GeoPoint, GeocodeProvider, Geocoder, GeocoderConfig, NominatimProvider};
use crate::render::{trip_paths, write_map, MapRenderer, RenderStats, DEFAULT_OUTPUT};
use crate::routing::{RouteResolver, RouteSegment, RoutingBackend, RoutingConfig, RoutingProvider};
use crate::trip::{load_trips, TripRecord};
use std::path::PathBuf;
use std::time::Duration;

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub animate: bool,
    pub animation_duration: Duration,
    pub geocoder: GeocoderConfig,
    pub routing: RoutingConfig,
    pub backend: RoutingBackend,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            input: input.into(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            title: "Trip Map".to_string(),
            animate: false,
            animation_duration: DEFAULT_DURATION,
            geocoder: GeocoderConfig::default(),
            routing: RoutingConfig::default(),
            backend: RoutingBackend::Osrm,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub records: Vec<TripRecord>,
    pub points: Vec<GeoPoint>,
    pub segments: Vec<RouteSegment>,
    pub stats: RenderStats,
    /// Distinct places sent to the geocoding service.
    pub geocode_lookups: usize,
    pub output: PathBuf,
}

/// Run the pipeline against the public Nominatim and routing services.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    let geocoder = NominatimProvider::new(config.geocoder.clone())?;
    let router = config.backend.build(config.routing.clone())?;
    run_with(config, geocoder, router)
}

/// Run the pipeline with the given backends. Nothing is written unless every
/// step before the write succeeds.
pub fn run_with<G, R>(config: &PipelineConfig, geocode_provider: G, routing_provider: R) -> Result<PipelineReport>
where
    G: GeocodeProvider,
    R: RoutingProvider,
{
    let records = load_trips(&config.input)?;
    log::info!("Processing {} locations from {}", records.len(), config.input.display());

    let mut geocoder = Geocoder::new(geocode_provider);
    let points = geocoder.resolve_all(&records)?;
    log::info!(
        "{} locations geocoded ({} distinct lookups via {})",
        points.len(),
        geocoder.cache().len(),
        geocoder.provider().name()
    );

    let mut resolver = RouteResolver::new(routing_provider);
    let segments = resolver.resolve_segments(&records, &points);

    let renderer = MapRenderer::new().with_title(config.title.clone());
    let map = renderer.render(&records, &points, &segments)?;
    log::info!(
        "Rendered {} markers and {} segments ({} car routes, {} straight-line fallbacks)",
        map.stats.markers,
        map.stats.segments,
        map.stats.car_routes,
        map.stats.fallbacks
    );

    let html = if config.animate {
        let timeline = Timeline::from_paths(&trip_paths(&points, &segments), config.animation_duration);
        log::info!(
            "Animating {:.0} km over {} frames at {} fps",
            timeline.total_km,
            timeline.frames,
            timeline.fps
        );
        inject_animation(&map.html, &timeline)?
    } else {
        map.html
    };

    write_map(&config.output, &html)?;
    log::info!("Map saved to {}", config.output.display());

    Ok(PipelineReport {
        records,
        points,
        segments,
        stats: map.stats,
        geocode_lookups: geocoder.cache().len(),
        output: config.output.clone(),
    })
}
