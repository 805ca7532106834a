// 🗺️ Map Renderer
// Turns ordered visits and route segments into a self-contained Leaflet page

use crate::error::{Result, TripMapError};
use crate::geocode::GeoPoint;
use crate::geodesic::{mean_center, unwrap_longitudes, Coordinate};
use crate::routing::RouteSegment;
use crate::trip::{RouteType, TripRecord};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_OUTPUT: &str = "trip_map.html";

const MAP_TEMPLATE: &str = include_str!("../static/map.html");
const DATA_PLACEHOLDER: &str = "__TRIP_MAP_DATA__";

const START_COLOR: &str = "#d63e2a";
const END_COLOR: &str = "#72b026";
const STOP_COLOR: &str = "#38aadd";
const FLIGHT_COLOR: &str = "#3388ff";
const CAR_COLOR: &str = "#e07b00";
const DASH_ARRAY: &str = "8 8";

const LEGEND_HTML: &str = concat!(
    "<div><span class=\"dot\" style=\"background:#d63e2a\"></span>Start</div>",
    "<div><span class=\"dot\" style=\"background:#38aadd\"></span>Stop</div>",
    "<div><span class=\"dot\" style=\"background:#72b026\"></span>End</div>",
    "<div><span class=\"line dashed\"></span>Flight</div>",
    "<div><span class=\"line\" style=\"border-top-color:#e07b00\"></span>Car</div>",
);

// ============================================================================
// MAP MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    Start,
    Stop,
    End,
}

impl MarkerRole {
    /// First visit starts the trip, last one ends it; a lone visit is a start.
    pub fn for_position(index: usize, count: usize) -> MarkerRole {
        if index == 0 {
            MarkerRole::Start
        } else if index + 1 == count {
            MarkerRole::End
        } else {
            MarkerRole::Stop
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            MarkerRole::Start => START_COLOR,
            MarkerRole::Stop => STOP_COLOR,
            MarkerRole::End => END_COLOR,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub sequence: usize,
    pub place: String,
    pub date: String,
    pub latitude: f64,
    pub longitude: f64,
    pub role: MarkerRole,
    pub color: &'static str,
    pub popup_html: String,
    pub tooltip_html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapLine {
    pub route_type: RouteType,
    pub fallback: bool,
    pub points: Vec<[f64; 2]>,
    pub color: &'static str,
    pub weight: u8,
    /// Leaflet `dashArray`; `None` draws a solid line.
    pub dash_array: Option<&'static str>,
    pub popup_html: String,
}

impl MapLine {
    pub fn is_dashed(&self) -> bool {
        self.dash_array.is_some()
    }
}

#[derive(Debug, Serialize)]
struct TileLayer {
    url: String,
    attribution: String,
}

#[derive(Debug, Serialize)]
struct MapData<'a> {
    title: &'a str,
    center: [f64; 2],
    zoom: u8,
    bounds: Option<[[f64; 2]; 2]>,
    tiles: TileLayer,
    markers: &'a [MapMarker],
    lines: &'a [MapLine],
    legend_html: &'static str,
}

/// Counts reported after a map is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderStats {
    pub markers: usize,
    pub segments: usize,
    pub car_routes: usize,
    pub fallbacks: usize,
}

/// A rendered page plus the model it was built from.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub html: String,
    pub markers: Vec<MapMarker>,
    pub lines: Vec<MapLine>,
    pub stats: RenderStats,
}

// ============================================================================
// RENDERER
// ============================================================================

#[derive(Debug, Clone)]
pub struct MapRenderer {
    pub title: String,
    pub zoom: u8,
    pub tile_url: String,
    pub tile_attribution: String,
}

impl Default for MapRenderer {
    fn default() -> Self {
        MapRenderer {
            title: "Trip Map".to_string(),
            zoom: 5,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            tile_attribution:
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
                    .to_string(),
        }
    }
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Build the HTML page for a trip. `points[i]` is where `records[i]`
    /// resolved to, and `segments` joins them in order.
    pub fn render(
        &self,
        records: &[TripRecord],
        points: &[GeoPoint],
        segments: &[RouteSegment],
    ) -> Result<RenderedMap> {
        if records.is_empty() {
            return Err(TripMapError::Template("nothing to render: no locations".to_string()));
        }
        if records.len() != points.len() || segments.len() != records.len() - 1 {
            return Err(TripMapError::Template(format!(
                "{} records, {} points and {} segments do not line up",
                records.len(),
                points.len(),
                segments.len()
            )));
        }

        let marker_coords = marker_coordinates(points);
        let markers = build_markers(records, points, &marker_coords);
        let lines: Vec<MapLine> = segments
            .iter()
            .zip(trip_paths(points, segments))
            .map(|(segment, path)| build_line(segment, &path))
            .collect();

        let center = mean_center(&marker_coords)
            .map(Coordinate::to_lat_lng)
            .unwrap_or([0.0, 0.0]);
        let bounds = if markers.len() > 1 {
            bounding_box(&marker_coords, &lines)
        } else {
            None
        };

        let data = MapData {
            title: &self.title,
            center,
            zoom: self.zoom,
            bounds,
            tiles: TileLayer {
                url: self.tile_url.clone(),
                attribution: self.tile_attribution.clone(),
            },
            markers: &markers,
            lines: &lines,
            legend_html: LEGEND_HTML,
        };
        let html = MAP_TEMPLATE.replacen(DATA_PLACEHOLDER, &embed_json(&data)?, 1);

        let stats = RenderStats {
            markers: markers.len(),
            segments: lines.len(),
            car_routes: segments
                .iter()
                .filter(|s| s.route_type == RouteType::Car && !s.fallback)
                .count(),
            fallbacks: segments.iter().filter(|s| s.fallback).count(),
        };

        Ok(RenderedMap {
            html,
            markers,
            lines,
            stats,
        })
    }
}

/// Marker positions with longitudes unwrapped along the trip, so a leg
/// across the antimeridian ends where its marker is drawn.
fn marker_coordinates(points: &[GeoPoint]) -> Vec<Coordinate> {
    let raw: Vec<Coordinate> = points.iter().map(GeoPoint::coordinate).collect();
    unwrap_longitudes(&raw)
}

/// The drawn path of every segment, shifted by whole turns so each one
/// starts next to its (unwrapped) origin marker. Road paths keep the exact
/// geometry the router returned. The animation replays exactly these paths.
pub fn trip_paths(points: &[GeoPoint], segments: &[RouteSegment]) -> Vec<Vec<Coordinate>> {
    let anchors = marker_coordinates(points);
    segments
        .iter()
        .zip(anchors.iter())
        .map(|(segment, anchor)| {
            let path = segment.display_path();
            let offset = match path.first() {
                Some(first) => ((anchor.longitude - first.longitude) / 360.0).round() * 360.0,
                None => 0.0,
            };
            path.into_iter()
                .map(|c| Coordinate::new(c.latitude, c.longitude + offset))
                .collect()
        })
        .collect()
}

fn build_markers(records: &[TripRecord], points: &[GeoPoint], coords: &[Coordinate]) -> Vec<MapMarker> {
    let count = records.len();
    records
        .iter()
        .zip(points.iter())
        .zip(coords.iter())
        .enumerate()
        .map(|(idx, ((record, point), coord))| {
            let role = MarkerRole::for_position(idx, count);
            let date = record.date_label();
            let place = escape_html(&point.place);
            MapMarker {
                sequence: idx + 1,
                place: point.place.clone(),
                latitude: coord.latitude,
                longitude: coord.longitude,
                role,
                color: role.color(),
                popup_html: format!("<b>{}</b><br>{}", place, date),
                tooltip_html: format!("{}. {} ({})", idx + 1, place, date),
                date,
            }
        })
        .collect()
}

fn build_line(segment: &RouteSegment, path: &[Coordinate]) -> MapLine {
    let label = match (segment.route_type, segment.fallback) {
        (RouteType::Flight, _) => "Flight",
        (RouteType::Car, false) => "Car",
        (RouteType::Car, true) => "Car (route unavailable, straight line)",
    };
    MapLine {
        route_type: segment.route_type,
        fallback: segment.fallback,
        points: path.iter().map(|c| c.to_lat_lng()).collect(),
        color: match segment.route_type {
            RouteType::Flight => FLIGHT_COLOR,
            RouteType::Car => CAR_COLOR,
        },
        weight: if segment.route_type == RouteType::Car { 4 } else { 2 },
        dash_array: segment.is_dashed().then_some(DASH_ARRAY),
        popup_html: format!(
            "{}: {} &rarr; {}",
            label,
            escape_html(&segment.from.place),
            escape_html(&segment.to.place)
        ),
    }
}

fn bounding_box(markers: &[Coordinate], lines: &[MapLine]) -> Option<[[f64; 2]; 2]> {
    let mut all = markers
        .iter()
        .map(|c| c.to_lat_lng())
        .chain(lines.iter().flat_map(|l| l.points.iter().copied()));
    let first = all.next()?;
    let (min, max) = all.fold((first, first), |(min, max), [lat, lon]| {
        (
            [min[0].min(lat), min[1].min(lon)],
            [max[0].max(lat), max[1].max(lon)],
        )
    });
    Some([min, max])
}

/// Serialize `value` for a `<script type="application/json">` block.
pub(crate) fn embed_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)
        .map_err(|e| TripMapError::Template(format!("failed to serialize map data: {}", e)))?;
    // A literal "</script>" inside a string would end the block early.
    Ok(json.replace("</", "<\\/"))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Write the page to `path`, creating or replacing the file.
pub fn write_map(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).map_err(|source| TripMapError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trip(spec: &[(&str, f64, f64, RouteType)]) -> (Vec<TripRecord>, Vec<GeoPoint>, Vec<RouteSegment>) {
        let records: Vec<TripRecord> = spec
            .iter()
            .enumerate()
            .map(|(i, (place, _, _, rt))| {
                TripRecord::new(
                    NaiveDate::from_ymd_opt(2024, 6, 1 + i as u32).unwrap(),
                    *place,
                    *rt,
                )
            })
            .collect();
        let points: Vec<GeoPoint> = spec
            .iter()
            .map(|(place, lat, lon, _)| GeoPoint::new(*place, *lat, *lon))
            .collect();
        let segments = points
            .windows(2)
            .zip(records.iter().skip(1))
            .map(|(pair, record)| RouteSegment {
                from: pair[0].clone(),
                to: pair[1].clone(),
                route_type: record.route_type,
                path: vec![pair[0].coordinate(), pair[1].coordinate()],
                fallback: false,
            })
            .collect();
        (records, points, segments)
    }

    #[test]
    fn test_marker_roles() {
        assert_eq!(MarkerRole::for_position(0, 1), MarkerRole::Start);
        assert_eq!(MarkerRole::for_position(0, 3), MarkerRole::Start);
        assert_eq!(MarkerRole::for_position(1, 3), MarkerRole::Stop);
        assert_eq!(MarkerRole::for_position(2, 3), MarkerRole::End);
    }

    #[test]
    fn test_render_markers_and_lines() {
        let (records, points, mut segments) = trip(&[
            ("Paris", 48.8566, 2.3522, RouteType::Flight),
            ("Lyon", 45.764, 4.8357, RouteType::Car),
            ("Rome", 41.9028, 12.4964, RouteType::Flight),
        ]);
        segments[0].path.insert(1, Coordinate::new(47.0, 3.5));

        let map = MapRenderer::new().render(&records, &points, &segments).unwrap();

        assert_eq!(map.markers.len(), 3);
        assert_eq!(map.lines.len(), 2);
        assert_eq!(map.markers[0].color, START_COLOR);
        assert_eq!(map.markers[1].color, STOP_COLOR);
        assert_eq!(map.markers[2].color, END_COLOR);
        assert_eq!(map.markers[2].sequence, 3);
        assert_eq!(map.markers[1].popup_html, "<b>Lyon</b><br>2024-06-02");

        assert!(!map.lines[0].is_dashed());
        assert_eq!(map.lines[0].points.len(), 3);
        assert!(map.lines[1].is_dashed());

        assert_eq!(
            map.stats,
            RenderStats {
                markers: 3,
                segments: 2,
                car_routes: 1,
                fallbacks: 0
            }
        );
        assert!(!map.html.contains(DATA_PLACEHOLDER));
        assert!(map.html.contains("\"sequence\":3"));
    }

    #[test]
    fn test_fallback_is_dashed() {
        let (records, points, mut segments) = trip(&[
            ("A", 10.0, 10.0, RouteType::Car),
            ("B", 11.0, 11.0, RouteType::Car),
        ]);
        segments[0].fallback = true;

        let map = MapRenderer::new().render(&records, &points, &segments).unwrap();
        assert!(map.lines[0].is_dashed());
        assert_eq!(map.stats.fallbacks, 1);
        assert_eq!(map.stats.car_routes, 0);
    }

    #[test]
    fn test_single_visit() {
        let (records, points, segments) = trip(&[("Oslo", 59.9139, 10.7522, RouteType::Flight)]);
        let map = MapRenderer::new().render(&records, &points, &segments).unwrap();

        assert_eq!(map.markers.len(), 1);
        assert_eq!(map.markers[0].role, MarkerRole::Start);
        assert!(map.lines.is_empty());
        assert!(map.html.contains("\"bounds\":null"));
    }

    #[test]
    fn test_render_rejects_mismatched_input() {
        let (records, points, _) = trip(&[
            ("A", 10.0, 10.0, RouteType::Flight),
            ("B", 11.0, 11.0, RouteType::Flight),
        ]);
        let err = MapRenderer::new().render(&records, &points, &[]).unwrap_err();
        assert!(matches!(err, TripMapError::Template(_)));

        let err = MapRenderer::new().render(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, TripMapError::Template(_)));
    }

    #[test]
    fn test_place_names_are_escaped() {
        let (records, points, segments) = trip(&[
            ("<script>alert(1)</script>", 1.0, 1.0, RouteType::Flight),
            ("Ben & Jerry's", 2.0, 2.0, RouteType::Flight),
        ]);
        let map = MapRenderer::new().render(&records, &points, &segments).unwrap();

        assert!(map.markers[0].popup_html.contains("&lt;script&gt;"));
        assert!(map.markers[1].tooltip_html.contains("Ben &amp; Jerry&#39;s"));
        assert!(!map.html.contains("</script>alert"));
        assert_eq!(map.html.matches("</script>").count(), MAP_TEMPLATE.matches("</script>").count());
    }

    #[test]
    fn test_paths_follow_unwrapped_markers() {
        let (records, points, segments) = trip(&[
            ("Tokyo", 35.6762, 139.6503, RouteType::Flight),
            ("Honolulu", 21.3069, -157.8583, RouteType::Flight),
            ("Los Angeles", 34.0522, -118.2437, RouteType::Flight),
        ]);
        let map = MapRenderer::new().render(&records, &points, &segments).unwrap();
        let paths = trip_paths(&points, &segments);

        assert!((map.markers[1].longitude - 202.1417).abs() < 1e-9);
        let first_leg_end = paths[0].last().unwrap();
        assert!((first_leg_end.longitude - map.markers[1].longitude).abs() < 1e-9);
        let second_leg_start = paths[1][0];
        assert!((second_leg_start.longitude - map.markers[1].longitude).abs() < 1e-9);
    }

    #[test]
    fn test_road_path_is_not_snapped_to_markers() {
        let (records, points, mut segments) = trip(&[
            ("Paris", 48.8566, 2.3522, RouteType::Flight),
            ("Lyon", 45.764, 4.8357, RouteType::Car),
        ]);
        // Routers start at the nearest road, not at the geocoded point.
        segments[0].path = vec![
            Coordinate::new(48.8500, 2.3600),
            Coordinate::new(47.3000, 3.5000),
            Coordinate::new(45.7600, 4.8300),
        ];
        let map = MapRenderer::new().render(&records, &points, &segments).unwrap();
        let paths = trip_paths(&points, &segments);

        let lons: Vec<f64> = paths[0].iter().map(|c| c.longitude).collect();
        assert_eq!(lons, vec![2.36, 3.5, 4.83]);
        assert_eq!(map.lines[0].points[1], [47.3, 3.5]);
    }

    #[test]
    fn test_road_path_across_antimeridian_keeps_its_shape() {
        let (records, points, mut segments) = trip(&[
            ("Suva", -18.1416, 178.4419, RouteType::Flight),
            ("Taveuni", -16.8, -179.98, RouteType::Car),
            ("Savusavu", -16.7794, 179.3381, RouteType::Car),
        ]);
        segments[1].path = vec![
            Coordinate::new(-16.8010, -179.9700),
            Coordinate::new(-16.7900, 179.5000),
        ];
        let paths = trip_paths(&points, &segments);

        // Second leg starts at the unwrapped Taveuni marker (180.02).
        assert!((paths[1][0].longitude - 180.03).abs() < 1e-9);
        assert!((paths[1][1].longitude - 179.5).abs() < 1e-9);
    }

    #[test]
    fn test_write_map_unwritable_path() {
        let err = write_map(Path::new("/nonexistent-dir/trip_map.html"), "<html></html>").unwrap_err();
        assert!(matches!(err, TripMapError::Io { .. }));
    }
}
