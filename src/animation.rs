// 🎬 Animation Injector
// Adds a play/pause/restart marker animation to a rendered map page

use crate::error::{Result, TripMapError};
use crate::geodesic::{haversine_km, Coordinate};
use crate::render::embed_json;
use serde::Serialize;
use std::time::Duration;

pub const FRAMES_PER_SECOND: u32 = 20;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(15);

const PLAYER_TEMPLATE: &str = include_str!("../static/animation.html");
const TIMELINE_PLACEHOLDER: &str = "__TRIP_TIMELINE__";

/// Every drawn route point in travel order, with the distance travelled to
/// reach it. The player spreads `frames` evenly over `total_km`, so the
/// marker moves at constant speed whatever the vertex spacing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub points: Vec<[f64; 2]>,
    pub cumulative_km: Vec<f64>,
    pub total_km: f64,
    pub fps: u32,
    pub frames: u32,
}

impl Timeline {
    /// Concatenate segment paths into one timeline lasting `duration` at
    /// [`FRAMES_PER_SECOND`].
    pub fn from_paths(paths: &[Vec<Coordinate>], duration: Duration) -> Self {
        let mut coords: Vec<Coordinate> = Vec::new();
        for point in paths.iter().flatten() {
            if coords.last() != Some(point) {
                coords.push(*point);
            }
        }

        let mut cumulative_km = Vec::with_capacity(coords.len());
        let mut total = 0.0;
        for (idx, point) in coords.iter().enumerate() {
            if idx > 0 {
                total += haversine_km(coords[idx - 1], *point);
            }
            cumulative_km.push(total);
        }

        let frames = (duration.as_secs_f64() * FRAMES_PER_SECOND as f64).round().max(1.0) as u32;

        Timeline {
            points: coords.iter().map(|c| c.to_lat_lng()).collect(),
            cumulative_km,
            total_km: total,
            fps: FRAMES_PER_SECOND,
            frames,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Where the marker sits at `frame`. Frames past the end clamp to the
    /// last point. Mirrors `positionAt` in the player script.
    pub fn position_at(&self, frame: u32) -> Option<Coordinate> {
        let first = *self.points.first()?;
        if self.points.len() == 1 || self.total_km <= 0.0 {
            return Some(Coordinate::new(first[0], first[1]));
        }

        let target = self.total_km * frame.min(self.frames) as f64 / self.frames as f64;
        let i = self
            .cumulative_km
            .partition_point(|&d| d < target)
            .clamp(1, self.points.len() - 1);
        let span = self.cumulative_km[i] - self.cumulative_km[i - 1];
        let t = if span > 0.0 {
            (target - self.cumulative_km[i - 1]) / span
        } else {
            1.0
        };
        let (a, b) = (self.points[i - 1], self.points[i]);
        Some(Coordinate::new(
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
        ))
    }
}

/// Insert the player controls, timeline data and script just before
/// `</body>`.
pub fn inject_animation(html: &str, timeline: &Timeline) -> Result<String> {
    let body_end = html
        .rfind("</body>")
        .ok_or_else(|| TripMapError::Template("rendered map has no </body> tag".to_string()))?;

    let player = PLAYER_TEMPLATE.replacen(TIMELINE_PLACEHOLDER, &embed_json(timeline)?, 1);

    let mut out = String::with_capacity(html.len() + player.len());
    out.push_str(&html[..body_end]);
    out.push_str(&player);
    out.push_str(&html[body_end..]);
    Ok(out)
}
