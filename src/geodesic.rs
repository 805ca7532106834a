//! Spherical helpers for drawing and animating trip legs.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Roughly one interpolated vertex per this many kilometres of flight arc.
const ARC_STEP_KM: f64 = 100.0;
const MAX_ARC_STEPS: usize = 64;

/// A bare latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// Finite, with |lat| ≤ 90 and |lon| ≤ 180.
    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }

    /// `[lat, lon]`, the layout Leaflet expects.
    pub fn to_lat_lng(self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Great-circle distance between two coordinates.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

fn to_unit_vector(c: Coordinate) -> [f64; 3] {
    let lat = c.latitude.to_radians();
    let lon = c.longitude.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn from_unit_vector(v: [f64; 3]) -> Coordinate {
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
    let lon = v[1].atan2(v[0]);
    Coordinate::new(lat.to_degrees(), lon.to_degrees())
}

/// Points along the great circle from `a` to `b`, endpoints included.
/// `steps` is the number of sub-segments, so `steps + 1` points come back.
pub fn great_circle_points(a: Coordinate, b: Coordinate, steps: usize) -> Vec<Coordinate> {
    let steps = steps.max(1);
    let va = to_unit_vector(a);
    let vb = to_unit_vector(b);
    let dot = (va[0] * vb[0] + va[1] * vb[1] + va[2] * vb[2]).clamp(-1.0, 1.0);
    let omega = dot.acos();

    // Coincident or antipodal endpoints have no unique arc.
    if omega.abs() < 1e-9 || (std::f64::consts::PI - omega).abs() < 1e-9 {
        return unwrap_longitudes(&[a, b]);
    }

    let sin_omega = omega.sin();
    let mut points = Vec::with_capacity(steps + 1);
    points.push(a);
    for i in 1..steps {
        let t = i as f64 / steps as f64;
        let wa = ((1.0 - t) * omega).sin() / sin_omega;
        let wb = (t * omega).sin() / sin_omega;
        points.push(from_unit_vector([
            wa * va[0] + wb * vb[0],
            wa * va[1] + wb * vb[1],
            wa * va[2] + wb * vb[2],
        ]));
    }
    points.push(b);

    unwrap_longitudes(&points)
}

/// Great-circle arc with a vertex density suited to the leg's length.
pub fn flight_arc(a: Coordinate, b: Coordinate) -> Vec<Coordinate> {
    let steps = (haversine_km(a, b) / ARC_STEP_KM).ceil() as usize;
    great_circle_points(a, b, steps.clamp(1, MAX_ARC_STEPS))
}

/// Shift longitudes by whole turns so that consecutive points never jump
/// more than 180°. Keeps antimeridian crossings drawn the short way.
pub fn unwrap_longitudes(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut out: Vec<Coordinate> = Vec::with_capacity(points.len());
    for p in points {
        let lon = match out.last() {
            Some(prev) => {
                let mut lon = p.longitude;
                while lon - prev.longitude > 180.0 {
                    lon -= 360.0;
                }
                while lon - prev.longitude < -180.0 {
                    lon += 360.0;
                }
                lon
            }
            None => p.longitude,
        };
        out.push(Coordinate::new(p.latitude, lon));
    }
    out
}

/// Arithmetic mean of a set of coordinates, used to center the map.
pub fn mean_center(points: &[Coordinate]) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    Some(Coordinate::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: Coordinate = Coordinate {
        latitude: 48.8566,
        longitude: 2.3522,
    };
    const LONDON: Coordinate = Coordinate {
        latitude: 51.5074,
        longitude: -0.1278,
    };

    #[test]
    fn test_coordinate_validity() {
        assert!(PARIS.is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 1e300).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_haversine_paris_london() {
        let d = haversine_km(PARIS, LONDON);
        assert!((d - 343.5).abs() < 2.0, "got {d}");
        assert_eq!(haversine_km(PARIS, PARIS), 0.0);
    }

    #[test]
    fn test_great_circle_endpoints() {
        let points = great_circle_points(PARIS, LONDON, 4);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], PARIS);
        assert_eq!(points[4], LONDON);

        // Every interior point sits on the arc: the two partial legs add up.
        let total = haversine_km(PARIS, LONDON);
        for p in &points[1..4] {
            let via = haversine_km(PARIS, *p) + haversine_km(*p, LONDON);
            assert!((via - total).abs() < 1e-6);
        }
    }

    #[test]
    fn test_great_circle_degenerate() {
        let points = great_circle_points(PARIS, PARIS, 8);
        assert_eq!(points, vec![PARIS, PARIS]);
    }

    #[test]
    fn test_flight_arc_density() {
        assert_eq!(flight_arc(PARIS, LONDON).len(), 5);

        let sydney = Coordinate::new(-33.8688, 151.2093);
        let arc = flight_arc(sydney, LONDON);
        assert_eq!(arc.len(), MAX_ARC_STEPS + 1);
    }

    #[test]
    fn test_unwrap_across_antimeridian() {
        let tokyo = Coordinate::new(35.6762, 139.6503);
        let honolulu = Coordinate::new(21.3069, -157.8583);
        let arc = flight_arc(tokyo, honolulu);

        assert!(arc
            .windows(2)
            .all(|w| (w[1].longitude - w[0].longitude).abs() <= 180.0));
        // Honolulu is pushed east of 180 instead of wrapping to -157.
        let last = arc.last().unwrap();
        assert!((last.longitude - (360.0 - 157.8583)).abs() < 1e-9);
    }

    #[test]
    fn test_mean_center() {
        assert_eq!(mean_center(&[]), None);
        let c = mean_center(&[Coordinate::new(10.0, 20.0), Coordinate::new(20.0, 40.0)]).unwrap();
        assert_eq!(c, Coordinate::new(15.0, 30.0));
    }
}
