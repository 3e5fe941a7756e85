//! Sliding-window decomposition of a raster and its label mask.
//!
//! Slides a fixed-size window over the raster (or over each crop window's
//! sub-raster) with a stride derived from the overlap ratio, then filters
//! tiles by label coverage. Ragged trailing windows that do not fit exactly
//! are dropped, never padded.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, s};

use crate::error::{CoreError, Result};
use crate::geometry::CropWindow;

/// One extracted training tile: image patch plus its label patch.
#[derive(Debug, Clone)]
pub struct Tile {
    /// `(tile_size, tile_size, channels)` image data.
    pub image: Array3<u8>,
    /// `(tile_size, tile_size)` label mask.
    pub label: Array2<u8>,
}

impl Tile {
    /// Fraction of non-zero pixels in the label mask.
    pub fn coverage(&self) -> f32 {
        let area = self.label.len();
        if area == 0 {
            return 0.0;
        }
        let nonzero = self.label.iter().filter(|&&v| v != 0).count();
        nonzero as f32 / area as f32
    }

    /// Whether the image patch is entirely zero-valued (outside the raster
    /// extent, e.g. from a clipped edge window).
    pub fn is_blank(&self) -> bool {
        self.image.iter().all(|&v| v == 0)
    }
}

/// Validated parameters for one split run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitParams {
    /// Tile edge length in native pixels.
    pub tile_size: usize,
    /// Overlap between adjacent tiles, in `[0, 1)`.
    pub overlap_ratio: f32,
    /// Keep only tiles whose coverage ratio lies in `[low, high]`.
    pub coverage_filter: Option<(f32, f32)>,
}

impl SplitParams {
    pub fn new(tile_size: usize, overlap_ratio: f32) -> Self {
        Self {
            tile_size,
            overlap_ratio,
            coverage_filter: None,
        }
    }

    pub fn with_coverage_filter(mut self, low: f32, high: f32) -> Self {
        self.coverage_filter = Some((low, high));
        self
    }

    /// Window step derived from the overlap ratio.
    pub fn stride(&self) -> usize {
        (self.tile_size as f32 * (1.0 - self.overlap_ratio)) as usize
    }

    /// Eager validation against the raster dimensions, before any I/O.
    pub fn validate(&self, raster_width: usize, raster_height: usize) -> Result<()> {
        if self.tile_size == 0 {
            return Err(CoreError::invalid_config("tile size must be positive"));
        }
        if self.tile_size > raster_width || self.tile_size > raster_height {
            return Err(CoreError::invalid_config(format!(
                "tile size {} exceeds raster extent {}x{}",
                self.tile_size, raster_width, raster_height
            )));
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(CoreError::invalid_config(format!(
                "overlap ratio must be in [0, 1), got {}",
                self.overlap_ratio
            )));
        }
        if self.stride() == 0 {
            return Err(CoreError::invalid_config(format!(
                "overlap ratio {} leaves no stride for tile size {}",
                self.overlap_ratio, self.tile_size
            )));
        }
        if let Some((low, high)) = self.coverage_filter
            && !(0.0 <= low && low <= high && high <= 1.0)
        {
            return Err(CoreError::invalid_config(format!(
                "coverage filter bounds must satisfy 0 <= low <= high <= 1, got ({low}, {high})"
            )));
        }
        Ok(())
    }
}

/// Split a raster and its label mask into tiles.
///
/// With crop windows, each window is clipped to the raster bounds and tiled
/// independently; tiles concatenate in window-then-scan order. Without
/// windows the full raster is tiled. The coverage filter then drops tiles
/// whose label coverage falls outside its bounds.
pub fn split(
    image: &Array3<u8>,
    mask: &Array2<u8>,
    windows: &[CropWindow],
    params: &SplitParams,
) -> Result<Vec<Tile>> {
    let (height, width, _channels) = image.dim();
    params.validate(width, height)?;
    if mask.dim() != (height, width) {
        return Err(CoreError::invalid_config(format!(
            "label mask {:?} does not match raster {}x{}",
            mask.dim(),
            width,
            height
        )));
    }

    let stride = params.stride();
    let size = params.tile_size;
    let mut tiles = Vec::new();

    if windows.is_empty() {
        slide(image.view(), mask.view(), size, stride, &mut tiles);
    } else {
        for win in windows {
            let win = win.clip_to(width as u32, height as u32);
            if win.width() < size as i32 || win.height() < size as i32 {
                log::warn!(
                    "crop window {}x{} smaller than tile size {size}, no tiles produced",
                    win.width(),
                    win.height()
                );
                continue;
            }
            let im = image.slice(s![
                win.y1 as usize..win.y2 as usize,
                win.x1 as usize..win.x2 as usize,
                ..
            ]);
            let lb = mask.slice(s![
                win.y1 as usize..win.y2 as usize,
                win.x1 as usize..win.x2 as usize
            ]);
            slide(im, lb, size, stride, &mut tiles);
        }
    }

    let produced = tiles.len();
    if let Some((low, high)) = params.coverage_filter {
        tiles.retain(|t| {
            let c = t.coverage();
            low <= c && c <= high
        });
        log::debug!(
            "coverage filter ({low}, {high}) kept {} of {produced} tiles",
            tiles.len()
        );
    }

    Ok(tiles)
}

/// Strict sliding window over one region; incomplete trailing windows drop.
fn slide(
    image: ArrayView3<'_, u8>,
    mask: ArrayView2<'_, u8>,
    size: usize,
    stride: usize,
    out: &mut Vec<Tile>,
) {
    let channels = image.dim().2;
    let im_windows = image.windows_with_stride((size, size, channels), (stride, stride, 1));
    let lb_windows = mask.windows_with_stride((size, size), (stride, stride));

    for (im, lb) in im_windows.into_iter().zip(lb_windows) {
        out.push(Tile {
            image: im.to_owned(),
            label: lb.to_owned(),
        });
    }
}
