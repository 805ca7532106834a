// 🛣️ Route Resolver
// Connects consecutive visits with flight lines or road-following car routes

use crate::error::{Result, TripMapError};
use crate::geocode::{GeoPoint, DEFAULT_USER_AGENT};
use crate::geodesic::{flight_arc, unwrap_longitudes, Coordinate};
use crate::retry::{with_retry, RetryConfig, RetryError};
use crate::trip::{RouteType, TripRecord};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OSRM_BASE_URL: &str = "https://router.project-osrm.org";
pub const ORS_BASE_URL: &str = "https://api.openrouteservice.org";

// ============================================================================
// CORE TYPES
// ============================================================================

/// The leg between two chronologically consecutive visits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub route_type: RouteType,
    /// Two points for flights and fallbacks, the road geometry for car routes.
    pub path: Vec<Coordinate>,
    /// Set when a car route could not be fetched and a straight line was
    /// used instead.
    pub fallback: bool,
}

impl RouteSegment {
    fn straight(from: &GeoPoint, to: &GeoPoint, route_type: RouteType, fallback: bool) -> Self {
        RouteSegment {
            from: from.clone(),
            to: to.clone(),
            route_type,
            path: vec![from.coordinate(), to.coordinate()],
            fallback,
        }
    }

    /// Drawn with a dashed stroke: flights and car legs without a road path.
    pub fn is_dashed(&self) -> bool {
        self.route_type == RouteType::Flight || self.fallback
    }

    /// The polyline to draw: straight legs follow the great circle, road
    /// routes follow their own geometry.
    pub fn display_path(&self) -> Vec<Coordinate> {
        if self.is_dashed() {
            flight_arc(self.from.coordinate(), self.to.coordinate())
        } else {
            unwrap_longitudes(&self.path)
        }
    }
}

/// A road-routing backend. Every provider honours the same contract: a
/// driving path from `from` to `to`, or an error.
pub trait RoutingProvider {
    fn route(&mut self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>>;

    fn name(&self) -> &str;
}

impl<P: RoutingProvider + ?Sized> RoutingProvider for Box<P> {
    fn route(&mut self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>> {
        (**self).route(from, to)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct RouteResolver<P: RoutingProvider> {
    provider: P,
}

impl<P: RoutingProvider> RouteResolver<P> {
    pub fn new(provider: P) -> Self {
        RouteResolver { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build the segment from `a` to `b`. Never fails: a car route that
    /// cannot be fetched degrades to a straight line.
    pub fn resolve_segment(&mut self, a: &GeoPoint, b: &GeoPoint, route_type: RouteType) -> RouteSegment {
        if route_type == RouteType::Flight {
            return RouteSegment::straight(a, b, route_type, false);
        }

        if a.coordinate() == b.coordinate() {
            return RouteSegment::straight(a, b, route_type, false);
        }

        match self.provider.route(a.coordinate(), b.coordinate()) {
            Ok(path) if path.len() >= 2 => RouteSegment {
                from: a.clone(),
                to: b.clone(),
                route_type,
                path,
                fallback: false,
            },
            Ok(path) => {
                log::warn!(
                    "{} returned {} point(s) for {} → {}, using a straight line",
                    self.provider.name(),
                    path.len(),
                    a.place,
                    b.place
                );
                RouteSegment::straight(a, b, route_type, true)
            }
            Err(err) => {
                log::warn!(
                    "Car route {} → {} unavailable ({}), using a straight line",
                    a.place,
                    b.place,
                    err
                );
                RouteSegment::straight(a, b, route_type, true)
            }
        }
    }

    /// One segment per consecutive pair of visits. A leg takes the route
    /// type of the visit it arrives at.
    pub fn resolve_segments(&mut self, records: &[TripRecord], points: &[GeoPoint]) -> Vec<RouteSegment> {
        debug_assert_eq!(records.len(), points.len());

        let total = points.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(total);
        for (idx, (pair, record)) in points.windows(2).zip(records.iter().skip(1)).enumerate() {
            if record.route_type == RouteType::Car {
                log::info!(
                    "[{}/{}] Routing by car: {} → {}",
                    idx + 1,
                    total,
                    pair[0].place,
                    pair[1].place
                );
            }
            segments.push(self.resolve_segment(&pair[0], &pair[1], record.route_type));
        }
        segments
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub osrm_base_url: String,
    pub ors_base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            osrm_base_url: OSRM_BASE_URL.to_string(),
            ors_base_url: ORS_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::new(2, Duration::from_millis(1000)),
        }
    }
}

/// Which routing service car legs use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingBackend {
    /// Public OSRM demo server, no key needed.
    Osrm,
    /// OpenRouteService with a personal API key.
    OpenRouteService { api_key: String },
}

impl RoutingBackend {
    /// A non-blank key selects OpenRouteService.
    pub fn from_api_key(api_key: Option<String>) -> Self {
        match api_key {
            Some(key) if !key.trim().is_empty() => RoutingBackend::OpenRouteService {
                api_key: key.trim().to_string(),
            },
            _ => RoutingBackend::Osrm,
        }
    }

    pub fn build(&self, config: RoutingConfig) -> Result<Box<dyn RoutingProvider>> {
        let provider: Box<dyn RoutingProvider> = match self {
            RoutingBackend::Osrm => Box::new(OsrmProvider::new(config)?),
            RoutingBackend::OpenRouteService { api_key } => {
                Box::new(OpenRouteServiceProvider::new(api_key.clone(), config)?)
            }
        };
        Ok(provider)
    }
}

fn http_client(config: &RoutingConfig) -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()?)
}

/// `[lon, lat]` pairs, the GeoJSON order both services use.
fn from_lon_lat(coordinates: Vec<[f64; 2]>) -> Vec<Coordinate> {
    coordinates
        .into_iter()
        .map(|[lon, lat]| Coordinate::new(lat, lon))
        .collect()
}

#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: LineString,
}

fn parse_osrm(response: OsrmResponse) -> Result<Vec<Coordinate>> {
    if response.code != "Ok" {
        return Err(TripMapError::Routing(format!(
            "OSRM answered {}: {}",
            response.code,
            response.message.unwrap_or_default()
        )));
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| TripMapError::Routing("OSRM returned no routes".to_string()))?;
    Ok(from_lon_lat(route.geometry.coordinates))
}

/// Free OSRM routing (driving profile).
pub struct OsrmProvider {
    client: reqwest::blocking::Client,
    config: RoutingConfig,
}

impl OsrmProvider {
    pub fn new(config: RoutingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }

    /// URL format: `{BASE}/route/v1/driving/{lon},{lat};{lon},{lat}`
    pub fn build_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.config.osrm_base_url.trim_end_matches('/'),
            from.longitude,
            from.latitude,
            to.longitude,
            to.latitude
        )
    }

    fn fetch(&self, from: Coordinate, to: Coordinate) -> std::result::Result<Vec<Coordinate>, RetryError> {
        let url = self.build_url(from, to);
        log::debug!("GET {}", url);
        let response: OsrmResponse = self
            .client
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .map_err(RetryError::from_http)?;

        parse_osrm(response).map_err(RetryError::NonRetryable)
    }
}

impl RoutingProvider for OsrmProvider {
    fn route(&mut self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>> {
        with_retry(|| self.fetch(from, to), &self.config.retry).map_err(RetryError::into_inner)
    }

    fn name(&self) -> &str {
        "OSRM"
    }
}

#[derive(Debug, Deserialize)]
struct OrsResponse {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Debug, Deserialize)]
struct OrsFeature {
    geometry: LineString,
}

fn parse_ors(response: OrsResponse) -> Result<Vec<Coordinate>> {
    let feature = response
        .features
        .into_iter()
        .next()
        .ok_or_else(|| TripMapError::Routing("OpenRouteService returned no route".to_string()))?;
    Ok(from_lon_lat(feature.geometry.coordinates))
}

/// OpenRouteService directions (driving-car profile), used when an API key
/// is configured.
pub struct OpenRouteServiceProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    config: RoutingConfig,
}

impl OpenRouteServiceProvider {
    pub fn new(api_key: String, config: RoutingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            api_key,
            config,
        })
    }

    pub fn directions_url(&self) -> String {
        format!(
            "{}/v2/directions/driving-car",
            self.config.ors_base_url.trim_end_matches('/')
        )
    }

    fn fetch(&self, from: Coordinate, to: Coordinate) -> std::result::Result<Vec<Coordinate>, RetryError> {
        let url = self.directions_url();
        let start = format!("{},{}", from.longitude, from.latitude);
        let end = format!("{},{}", to.longitude, to.latitude);
        log::debug!("GET {} start={} end={}", url, start, end);

        let response: OrsResponse = self
            .client
            .get(&url)
            .header("Authorization", self.api_key.as_str())
            .query(&[("start", start.as_str()), ("end", end.as_str())])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .map_err(RetryError::from_http)?;

        parse_ors(response).map_err(RetryError::NonRetryable)
    }
}

impl RoutingProvider for OpenRouteServiceProvider {
    fn route(&mut self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>> {
        with_retry(|| self.fetch(from, to), &self.config.retry).map_err(RetryError::into_inner)
    }

    fn name(&self) -> &str {
        "OpenRouteService"
    }
}
