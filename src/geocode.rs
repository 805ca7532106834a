// 📍 Geocoder
// Resolves place names to coordinates, one lookup per unique name

use crate::error::{Result, TripMapError};
use crate::geodesic::Coordinate;
use crate::retry::{with_retry, RateLimiter, RetryConfig, RetryError};
use crate::trip::TripRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "tripmap_visualizer";
pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

// ============================================================================
// CORE TYPES
// ============================================================================

/// A place name together with the coordinates it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(place: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            place: place.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A geocoding backend.
///
/// `Ok(None)` means the service answered but knows no such place.
pub trait GeocodeProvider {
    fn lookup(&mut self, place: &str) -> Result<Option<Coordinate>>;

    /// Provider name for log lines.
    fn name(&self) -> &str;
}

// ============================================================================
// CACHE
// ============================================================================

/// Run-scoped cache of resolved places, keyed by the exact place string.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: HashMap<String, GeoPoint>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, place: &str) -> Option<&GeoPoint> {
        self.entries.get(place)
    }

    pub fn insert(&mut self, point: GeoPoint) {
        self.entries.insert(point.place.clone(), point);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// GEOCODER
// ============================================================================

pub struct Geocoder<P: GeocodeProvider> {
    provider: P,
    cache: GeocodeCache,
}

impl<P: GeocodeProvider> Geocoder<P> {
    pub fn new(provider: P) -> Self {
        Geocoder {
            provider,
            cache: GeocodeCache::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Resolve one place, consulting the cache first.
    pub fn resolve(&mut self, place: &str) -> Result<GeoPoint> {
        if let Some(point) = self.cache.get(place) {
            log::debug!("Geocode cache hit: {}", place);
            return Ok(point.clone());
        }

        let found = self.provider.lookup(place).map_err(|err| match err {
            TripMapError::Geocode { .. } => err,
            other => TripMapError::Geocode {
                place: place.to_string(),
                reason: other.to_string(),
            },
        })?;

        let coordinate = found.ok_or_else(|| TripMapError::Geocode {
            place: place.to_string(),
            reason: format!("no match from {}", self.provider.name()),
        })?;

        let point = GeoPoint::new(place, coordinate.latitude, coordinate.longitude);
        self.cache.insert(point.clone());
        Ok(point)
    }

    /// Resolve every record in order. Stops at the first place that cannot
    /// be resolved.
    pub fn resolve_all(&mut self, records: &[TripRecord]) -> Result<Vec<GeoPoint>> {
        let total = records.len();
        let mut points = Vec::with_capacity(total);

        for (idx, record) in records.iter().enumerate() {
            let point = self.resolve(&record.place).inspect_err(|_| {
                log::error!("[{}/{}] Geocoding: {} ✗ not found", idx + 1, total, record.place);
            })?;
            log::info!(
                "[{}/{}] Geocoding: {} ✓ ({:.4}, {:.4})",
                idx + 1,
                total,
                record.place,
                point.latitude,
                point.longitude
            );
            points.push(point);
        }

        Ok(points)
    }
}

// ============================================================================
// NOMINATIM
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Minimum spacing between requests. Nominatim's usage policy allows at
    /// most one request per second.
    pub min_delay: Duration,
    pub retry: RetryConfig,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        GeocoderConfig {
            base_url: NOMINATIM_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            min_delay: Duration::from_millis(1500),
            retry: RetryConfig::new(3, Duration::from_millis(2000)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// OpenStreetMap's free Nominatim search service.
pub struct NominatimProvider {
    client: reqwest::blocking::Client,
    config: GeocoderConfig,
    limiter: RateLimiter,
}

impl NominatimProvider {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.min_delay),
            config,
        })
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }

    fn fetch(&mut self, place: &str) -> std::result::Result<Option<Coordinate>, RetryError> {
        self.limiter.wait();

        let url = self.search_url();
        log::debug!("GET {} q={}", url, place);
        let places: Vec<NominatimPlace> = self
            .client
            .get(&url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .map_err(RetryError::from_http)?;

        parse_first_place(place, places).map_err(RetryError::NonRetryable)
    }
}

fn parse_first_place(place: &str, places: Vec<NominatimPlace>) -> Result<Option<Coordinate>> {
    let Some(first) = places.into_iter().next() else {
        return Ok(None);
    };

    let parse = |value: &str| {
        value.parse::<f64>().map_err(|_| TripMapError::Geocode {
            place: place.to_string(),
            reason: format!("malformed coordinate '{}'", value),
        })
    };
    let coordinate = Coordinate::new(parse(&first.lat)?, parse(&first.lon)?);
    if !coordinate.is_valid() {
        return Err(TripMapError::Geocode {
            place: place.to_string(),
            reason: format!("coordinate out of range ({}, {})", first.lat, first.lon),
        });
    }

    if let Some(name) = first.display_name {
        log::debug!("'{}' matched '{}'", place, name);
    }
    Ok(Some(coordinate))
}

impl GeocodeProvider for NominatimProvider {
    fn lookup(&mut self, place: &str) -> Result<Option<Coordinate>> {
        let retry = self.config.retry.clone();
        with_retry(|| self.fetch(place), &retry).map_err(RetryError::into_inner)
    }

    fn name(&self) -> &str {
        "Nominatim"
    }
}
