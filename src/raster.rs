//! Raster source seam.
//!
//! The concrete geo-raster decoding library stays outside this crate; the
//! pipeline only needs dimensions, the geotransform, and sub-window reads.
//! [`MemoryRaster`] is the in-process implementation used by the pipeline
//! and tests.

use ndarray::{Array3, s};

use crate::geo::GeoTransform;

/// A loaded raster the tiling pipeline can read from.
///
/// Pixel data is `(height, width, channels)` row-major `u8`. Window
/// coordinates are native raster pixels and must already be clipped to the
/// raster extent.
pub trait RasterSource {
    /// Raster width in native pixels.
    fn width(&self) -> u32;

    /// Raster height in native pixels.
    fn height(&self) -> u32;

    /// The raster's pixel-to-geographic transform.
    fn geo_transform(&self) -> GeoTransform;

    /// Read the half-open window `[x1, x2) x [y1, y2)`.
    fn read_window(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Array3<u8>;

    /// Read the full raster extent.
    fn read_full(&self) -> Array3<u8> {
        self.read_window(0, 0, self.width(), self.height())
    }
}

/// An in-memory raster backed by an owned `ndarray` buffer.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    data: Array3<u8>,
    transform: GeoTransform,
}

impl MemoryRaster {
    /// Wrap a `(height, width, channels)` array with its transform.
    pub fn new(data: Array3<u8>, transform: GeoTransform) -> Self {
        Self { data, transform }
    }

    /// Wrap pixel data with the ungeoreferenced identity transform.
    pub fn without_georeference(data: Array3<u8>) -> Self {
        Self::new(data, GeoTransform::identity())
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> u32 {
        self.data.dim().1 as u32
    }

    fn height(&self) -> u32 {
        self.data.dim().0 as u32
    }

    fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    fn read_window(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Array3<u8> {
        self.data
            .slice(s![y1 as usize..y2 as usize, x1 as usize..x2 as usize, ..])
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_memory_raster_dimensions() {
        let r = MemoryRaster::without_georeference(Array3::zeros((40, 60, 3)));
        assert_eq!(r.width(), 60);
        assert_eq!(r.height(), 40);
        assert_eq!(r.channels(), 3);
        assert!(!r.geo_transform().is_georeferenced());
    }

    #[test]
    fn test_read_window_slices_expected_region() {
        let mut data = Array3::zeros((10, 10, 3));
        data[[4, 6, 0]] = 200;
        let r = MemoryRaster::without_georeference(data);

        let win = r.read_window(5, 3, 9, 8);
        assert_eq!(win.dim(), (5, 4, 3));
        // (row 4, col 6) lands at (1, 1) inside the window
        assert_eq!(win[[1, 1, 0]], 200);
    }

    #[test]
    fn test_read_full_matches_extent() {
        let r = MemoryRaster::without_georeference(Array3::zeros((7, 9, 3)));
        assert_eq!(r.read_full().dim(), (7, 9, 3));
    }
}
