//! Label mask rasterization.
//!
//! Burns point annotations as filled discs of a fixed real-world radius and
//! polygon annotations as per-class filled interiors into a single-channel
//! mask. Masks always use the raster's native pixel dimensions; callers
//! convert canvas coordinates to native pixels first.

use ndarray::Array2;

use crate::geometry::{Point, Polygon};

/// Burns annotations into a native-resolution label mask.
#[derive(Debug, Clone, Copy)]
pub struct LabelRasterizer {
    radius_px: f32,
}

impl LabelRasterizer {
    /// Disc radius from a real-world radius in meters and the pixel size.
    pub fn from_meters(radius_m: f64, pixel_size: f64) -> Self {
        Self {
            radius_px: (radius_m / pixel_size) as f32,
        }
    }

    /// Disc radius directly in pixels.
    pub fn with_radius_px(radius_px: f32) -> Self {
        Self { radius_px }
    }

    pub fn radius_px(&self) -> f32 {
        self.radius_px
    }

    /// Burn a filled disc around each native-pixel position.
    pub fn rasterize_points(
        &self,
        width: u32,
        height: u32,
        positions: &[(i32, i32)],
        class: u8,
    ) -> Array2<u8> {
        let mut mask = Array2::zeros((height as usize, width as usize));
        for &(x, y) in positions {
            burn_disc(&mut mask, x, y, self.radius_px, class);
        }
        mask
    }

    /// Fill each polygon's interior with its class label.
    ///
    /// Open or degenerate polygons enclose no area and burn nothing.
    pub fn rasterize_polygons(
        &self,
        width: u32,
        height: u32,
        polygons: &[(Polygon, u8)],
    ) -> Array2<u8> {
        let mut mask = Array2::zeros((height as usize, width as usize));
        for (poly, class) in polygons {
            fill_polygon(&mut mask, poly, *class);
        }
        mask
    }
}

/// Burn one filled disc into the mask.
///
/// The edge is coverage-rounded: a boundary pixel is labeled when its center
/// lies within half a pixel of the disc, which is what anti-aliased circle
/// drawing yields once quantized to an integer label value.
pub fn burn_disc(mask: &mut Array2<u8>, cx: i32, cy: i32, radius: f32, class: u8) {
    let (rows, cols) = mask.dim();
    let r_bound = radius.ceil() as i32 + 1;

    let y_min = (cy - r_bound).max(0);
    let y_max = (cy + r_bound).min(rows as i32 - 1);
    let x_min = (cx - r_bound).max(0);
    let x_max = (cx + r_bound).min(cols as i32 - 1);

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            let dist = (dx * dx + dy * dy).sqrt();
            let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
            if coverage >= 0.5 {
                mask[[y as usize, x as usize]] = class;
            }
        }
    }
}

/// Fill a polygon interior with a class label via per-row containment tests.
pub fn fill_polygon(mask: &mut Array2<u8>, poly: &Polygon, class: u8) {
    if !poly.is_fillable() {
        return;
    }
    let Some((min_x, min_y, max_x, max_y)) = poly.bounding_box() else {
        return;
    };

    let (rows, cols) = mask.dim();
    let y_min = (min_y.floor() as i32).max(0);
    let y_max = (max_y.ceil() as i32).min(rows as i32 - 1);
    let x_min = (min_x.floor() as i32).max(0);
    let x_max = (max_x.ceil() as i32).min(cols as i32 - 1);

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            if poly.contains(&Point::new(x as f32, y as f32)) {
                mask[[y as usize, x as usize]] = class;
            }
        }
    }
}
