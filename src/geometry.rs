//! Canvas-space geometry primitives.
//!
//! All coordinates here are in scaled canvas space; divide by the session's
//! scale factor to recover native raster pixels.

use serde::{Deserialize, Serialize};

/// A 2D point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned crop window restricting tiling to a raster sub-region.
///
/// Stored as corner coordinates; `normalized` guarantees `x1 < x2` and
/// `y1 < y2` regardless of the drag direction that created the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl CropWindow {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a window from two drag corner points.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x1: a.x.round() as i32,
            y1: a.y.round() as i32,
            x2: b.x.round() as i32,
            y2: b.y.round() as i32,
        }
        .normalized()
    }

    /// Return the window with corners swapped so that `x1 < x2, y1 < y2`.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    /// Clamp all four coordinates into `[0, width] x [0, height]`.
    ///
    /// Out-of-bound coordinates are silently truncated, never an error. The
    /// result of clipping a normalized window stays normalized; a window
    /// lying entirely outside the raster collapses to zero width or height.
    pub fn clip_to(&self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.clamp(0, width as i32),
            y1: self.y1.clamp(0, height as i32),
            x2: self.x2.clamp(0, width as i32),
            y2: self.y2.clamp(0, height as i32),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Get the center point of the window.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x1 + self.x2) as f32 / 2.0,
            (self.y1 + self.y2) as f32 / 2.0,
        )
    }

    /// Check if a point is inside the window (edges inclusive).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x1 as f32
            && point.x <= self.x2 as f32
            && point.y >= self.y1 as f32
            && point.y <= self.y2 as f32
    }

    /// Scale all coordinates by a factor, rounding to the nearest pixel.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x1: (self.x1 as f64 * factor).round() as i32,
            y1: (self.y1 as f64 * factor).round() as i32,
            x2: (self.x2 as f64 * factor).round() as i32,
            y2: (self.y2 as f64 * factor).round() as i32,
        }
    }
}

/// A polygon annotation defined by a sequence of vertices (parcel workflow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// The vertices of the polygon in order.
    pub vertices: Vec<Point>,
    /// Whether the polygon is closed (last vertex connects to first).
    pub closed: bool,
}

impl Polygon {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            closed: false,
        }
    }

    /// Add a vertex to the polygon.
    pub fn push(&mut self, point: Point) {
        self.vertices.push(point);
    }

    /// Close the polygon.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Check if the polygon encloses an area (closed with at least 3 vertices).
    pub fn is_fillable(&self) -> bool {
        self.closed && self.vertices.len() >= 3
    }

    /// Get the axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> Option<(f32, f32, f32, f32)> {
        if self.vertices.is_empty() {
            return None;
        }

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for p in &self.vertices {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        Some((min_x, min_y, max_x, max_y))
    }

    /// Check if a point is inside the polygon (ray casting algorithm).
    pub fn contains(&self, point: &Point) -> bool {
        if !self.is_fillable() {
            return false;
        }

        let mut inside = false;
        let n = self.vertices.len();

        let mut j = n - 1;
        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];

            if ((vi.y > point.y) != (vj.y > point.y))
                && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

impl Default for Polygon {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert!((p1.distance_to(&p2) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_window_normalized() {
        let win = CropWindow::new(80, 90, 10, 20).normalized();
        assert_eq!(win, CropWindow::new(10, 20, 80, 90));

        // Already normalized windows are unchanged
        assert_eq!(win.normalized(), win);
    }

    #[test]
    fn test_window_from_corners_any_drag_direction() {
        let a = Point::new(50.4, 60.6);
        let b = Point::new(10.0, 20.0);
        let win = CropWindow::from_corners(a, b);
        assert_eq!(win, CropWindow::new(10, 20, 50, 61));
    }

    #[test]
    fn test_window_clip_truncates_silently() {
        let win = CropWindow::new(-20, -5, 150, 90).clip_to(100, 80);
        assert_eq!(win, CropWindow::new(0, 0, 100, 80));

        // In-bounds windows are unchanged
        let inner = CropWindow::new(10, 10, 50, 50);
        assert_eq!(inner.clip_to(100, 80), inner);
    }

    #[test]
    fn test_window_clip_fully_outside_stays_normalized() {
        // A window entirely past the right edge collapses to zero width
        // instead of producing inverted corners.
        let win = CropWindow::new(150, 0, 200, 50).clip_to(100, 100);
        assert_eq!(win, CropWindow::new(100, 0, 100, 50));
        assert_eq!(win.width(), 0);

        // Entirely above the top edge collapses to zero height
        let win = CropWindow::new(10, -80, 40, -20).clip_to(100, 100);
        assert_eq!(win.height(), 0);
        assert_eq!(win, win.normalized());
    }

    #[test]
    fn test_window_contains_and_center() {
        let win = CropWindow::new(10, 10, 50, 30);
        assert!(win.contains(&Point::new(30.0, 20.0)));
        assert!(win.contains(&Point::new(10.0, 10.0))); // Edge
        assert!(!win.contains(&Point::new(5.0, 20.0)));
        assert_eq!(win.center(), Point::new(30.0, 20.0));
    }

    #[test]
    fn test_polygon_contains() {
        // Create a square polygon
        let mut poly = Polygon::new();
        poly.push(Point::new(0.0, 0.0));
        poly.push(Point::new(100.0, 0.0));
        poly.push(Point::new(100.0, 100.0));
        poly.push(Point::new(0.0, 100.0));
        poly.close();

        assert!(poly.contains(&Point::new(50.0, 50.0)));
        assert!(!poly.contains(&Point::new(150.0, 50.0)));
    }

    #[test]
    fn test_open_polygon_is_not_fillable() {
        let mut poly = Polygon::new();
        poly.push(Point::new(0.0, 0.0));
        poly.push(Point::new(10.0, 0.0));
        poly.push(Point::new(10.0, 10.0));
        assert!(!poly.is_fillable());
        assert!(!poly.contains(&Point::new(5.0, 5.0)));
    }
}
