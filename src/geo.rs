//! Affine geotransform and canvas scale-factor math.
//!
//! Converts between native raster pixels, a uniform geographic coordinate
//! system, and the scaled canvas space annotations are stored in.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Axis-aligned affine transformation for georeferenced rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates:
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// Rotation terms are assumed zero (north-up imagery); `pixel_height` is
/// typically negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Create a new transform. Fails only for a zero pixel width.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Result<Self> {
        if pixel_width == 0.0 {
            return Err(CoreError::PixelSizeZero);
        }
        Ok(Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        })
    }

    /// Create from GDAL-style coefficients
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    /// The rotation terms are ignored.
    pub fn from_gdal(coeffs: [f64; 6]) -> Result<Self> {
        Self::new(coeffs[0], coeffs[3], coeffs[1], coeffs[5])
    }

    /// The GDAL default transform for ungeoreferenced imagery.
    pub fn identity() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
        }
    }

    /// Whether the raster carries real geographic coordinates.
    ///
    /// The GDAL default `(origin_x, pixel_width) == (0, 1)` is the sentinel
    /// for plain, ungeoreferenced imagery.
    pub fn is_georeferenced(&self) -> bool {
        !(self.origin_x == 0.0 && self.pixel_width == 1.0)
    }

    /// Convert pixel coordinates to geographic coordinates.
    pub fn to_geo(&self, px: f64, py: f64) -> (f64, f64) {
        (
            self.origin_x + px * self.pixel_width,
            self.origin_y + py * self.pixel_height,
        )
    }

    /// Convert geographic coordinates to pixel coordinates.
    ///
    /// Inverse of [`to_geo`](Self::to_geo) up to rounding.
    pub fn to_pixel(&self, gx: f64, gy: f64) -> (f64, f64) {
        (
            (gx - self.origin_x) / self.pixel_width,
            (gy - self.origin_y) / self.pixel_height,
        )
    }
}

/// Resampling factor that brings a raster to the target pixel size.
///
/// A native pixel size of 0.1 m with a 0.05 m target yields 2.0: the canvas
/// holds twice the native pixel count in each dimension.
pub fn scale_for_pixel_size(native_pixel_size: f64, target_pixel_size: f64) -> Result<f64> {
    if target_pixel_size <= 0.0 {
        return Err(CoreError::invalid_config(format!(
            "target pixel size must be positive, got {target_pixel_size}"
        )));
    }
    Ok(native_pixel_size.abs() / target_pixel_size)
}

/// Reduction factor keeping the canvas within a maximum dimension.
///
/// Returns 1.0 if `width` and `height` already fit within `limit`, otherwise
/// `limit / max(width, height)`.
pub fn clamp_to_size_limit(width: f64, height: f64, limit: f64) -> f64 {
    let max_len = width.max(height);
    if max_len > limit { limit / max_len } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_zero_pixel_width_rejected() {
        assert!(matches!(
            GeoTransform::new(10.0, 20.0, 0.0, -1.0),
            Err(CoreError::PixelSizeZero)
        ));
    }

    #[test]
    fn test_geo_pixel_round_trip() {
        let t = GeoTransform::new(250_000.0, 2_650_000.0, 0.107541, -0.107541).unwrap();
        let (gx, gy) = t.to_geo(123.0, 456.0);
        let (px, py) = t.to_pixel(gx, gy);
        // Origins in the millions leave ~1e-9 of f64 rounding after the
        // divide, so compare against a tolerance that survives it.
        assert!((px - 123.0).abs() < 1e-6);
        assert!((py - 456.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_gdal_ignores_rotation() {
        let t = GeoTransform::from_gdal([100.0, 0.5, 0.0, 200.0, 0.0, -0.5]).unwrap();
        assert_eq!(t.origin_x, 100.0);
        assert_eq!(t.origin_y, 200.0);
        assert_eq!(t.pixel_width, 0.5);
        assert_eq!(t.pixel_height, -0.5);
    }

    #[test]
    fn test_georeference_sentinel() {
        assert!(!GeoTransform::identity().is_georeferenced());
        let t = GeoTransform::new(250_000.0, 2_650_000.0, 0.05, -0.05).unwrap();
        assert!(t.is_georeferenced());
    }

    #[test]
    fn test_scale_for_pixel_size() {
        // Coarser native resolution upscales onto the canvas
        assert!((scale_for_pixel_size(0.1, 0.05).unwrap() - 2.0).abs() < EPSILON);
        // Matching resolutions are identity
        assert!((scale_for_pixel_size(0.05, 0.05).unwrap() - 1.0).abs() < EPSILON);
        // Negative (north-up) pixel heights are handled by magnitude
        assert!((scale_for_pixel_size(-0.1, 0.05).unwrap() - 2.0).abs() < EPSILON);
        assert!(scale_for_pixel_size(0.1, 0.0).is_err());
    }

    #[test]
    fn test_clamp_to_size_limit() {
        assert_eq!(clamp_to_size_limit(8000.0, 4000.0, 16000.0), 1.0);
        let f = clamp_to_size_limit(32000.0, 8000.0, 16000.0);
        assert!((f - 0.5).abs() < EPSILON);
    }
}
