// Trip Map - Core Library
// Shared by the tripmap and trip-clean binaries and the integration tests

pub mod animation;
pub mod clean;
pub mod error;
pub mod geocode;
pub mod geodesic;
pub mod pipeline;
pub mod render;
pub mod retry;
pub mod routing;
pub mod trip;

// Re-export commonly used types
pub use animation::{inject_animation, Timeline, FRAMES_PER_SECOND};
pub use clean::{clean_trip_csv, default_clean_path, CleanOptions, CleanReport};
pub use error::{ErrorKind, Result, TripMapError};
pub use geocode::{GeoPoint, GeocodeCache, GeocodeProvider, Geocoder, GeocoderConfig, NominatimProvider};
pub use geodesic::Coordinate;
pub use pipeline::{run, run_with, PipelineConfig, PipelineReport};
pub use render::{trip_paths, write_map, MapRenderer, RenderStats, RenderedMap, DEFAULT_OUTPUT};
pub use routing::{
    OpenRouteServiceProvider, OsrmProvider, RouteResolver, RouteSegment, RoutingBackend,
    RoutingConfig, RoutingProvider,
};
pub use trip::{load_trips, parse_date, RouteType, TripRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
