//! Nearest-neighbor queries over the annotation point set.
//!
//! Point counts are small (hundreds to low thousands per raster), so a
//! linear scan is the reference semantics. An accelerated structure may be
//! substituted, but it must reproduce the linear-scan tie order: equal
//! distances resolve to the earliest-inserted point.

use crate::geometry::Point;

/// Find the nearest point to `query`, returning its index and distance.
///
/// Ties are broken by first-found order, stable in insertion order.
pub fn nearest(points: &[Point], query: &Point) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, p) in points.iter().enumerate() {
        let dist = p.distance_to(query);
        match best {
            Some((_, d)) if dist >= d => {}
            _ => best = Some((i, dist)),
        }
    }
    best
}

/// Check whether any point lies within `radius` of `query` (inclusive).
pub fn has_neighbor_within(points: &[Point], query: &Point, radius: f32) -> bool {
    points.iter().any(|p| p.distance_to(query) <= radius)
}

/// Indices of all points within `radius` of `query` (inclusive), in order.
pub fn indices_within(points: &[Point], query: &Point, radius: f32) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.distance_to(query) <= radius)
        .map(|(i, _)| i)
        .collect()
}
