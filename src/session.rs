//! Session facade: the narrow interface the GUI layer calls into.
//!
//! A session owns the configuration, the annotation store, and the loaded
//! raster. It computes the canvas scale factor on raster load, routes
//! pointer events to the store, imports and exports position CSVs, and
//! orchestrates dataset production.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SessionConfig;
use crate::dataset::{DatasetManifest, DatasetWriter, WriterParams};
use crate::error::{CoreError, Result};
use crate::geo::{GeoTransform, clamp_to_size_limit, scale_for_pixel_size};
use crate::geometry::{CropWindow, Point};
use crate::positions::{ParsedPositions, PositionKind, parse_positions};
use crate::raster::RasterSource;
use crate::rasterize::LabelRasterizer;
use crate::store::{AnnotationStore, LoadMode, PointToggle};
use crate::tiler::{self, SplitParams};

/// CSV payloads produced by a position export.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionExport {
    /// Integer native-pixel positions.
    pub pixel_csv: String,
    /// Geographic positions; only present for georeferenced rasters.
    pub geo_csv: Option<String>,
}

/// Read-only copy of the annotation state in native raster pixels.
///
/// Taken before an export so concurrent interactive edits cannot race with
/// the tiling pass.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Point positions in native pixels, out-of-extent positions dropped.
    pub points: Vec<(i32, i32)>,
    /// Crop windows in native pixels, clipped to the raster extent.
    pub windows: Vec<CropWindow>,
}

/// One annotation session over a loaded raster.
pub struct Session {
    config: SessionConfig,
    store: AnnotationStore,
    raster: Option<Box<dyn RasterSource>>,
    transform: GeoTransform,
    scale_factor: f64,
    export_in_flight: AtomicBool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            store: AnnotationStore::new(0.0, 0.0),
            raster: None,
            transform: GeoTransform::identity(),
            scale_factor: 1.0,
            export_in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The composite canvas scale factor for the loaded raster.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    pub fn has_raster(&self) -> bool {
        self.raster.is_some()
    }

    /// The live annotation store, for rendering and queries.
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Mutable store access for wholesale actions (clean buttons).
    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    // ========================================================================
    // Raster loading
    // ========================================================================

    /// Load a raster and reset the session around it.
    ///
    /// The scale factor is the resample-to-target-pixel-size factor, further
    /// reduced if the scaled canvas would exceed the size limit. All prior
    /// points and crop windows are cleared.
    pub fn load_raster(&mut self, source: Box<dyn RasterSource>) -> Result<()> {
        let transform = source.geo_transform();
        let resample = if transform.is_georeferenced() {
            scale_for_pixel_size(transform.pixel_width, self.config.target_pixel_size)?
        } else {
            1.0
        };

        let scaled_w = source.width() as f64 * resample;
        let scaled_h = source.height() as f64 * resample;
        let limit = clamp_to_size_limit(scaled_w, scaled_h, self.config.canvas_size_limit as f64);
        let scale = resample * limit;

        let mut store = AnnotationStore::new((scaled_w * limit) as f32, (scaled_h * limit) as f32);
        let to_canvas = scale / self.config.target_pixel_size;
        store.set_merge_radius((self.config.merge_radius_m * to_canvas) as f32);
        store.set_close_distance((self.config.close_distance_m * to_canvas) as f32);
        store.set_min_window_size(((self.config.min_window_size as f64 * scale) as i32).max(1));

        log::info!(
            "raster loaded: {}x{} native px, scale factor {scale:.4}",
            source.width(),
            source.height()
        );

        self.transform = transform;
        self.scale_factor = scale;
        self.store = store;
        self.raster = Some(source);
        Ok(())
    }

    // ========================================================================
    // Pointer events
    // ========================================================================

    /// Toggle a point at a canvas position (double-click / key press).
    pub fn toggle_point_at(&mut self, pos: Point) -> PointToggle {
        if self.raster.is_none() {
            return PointToggle::Ignored;
        }
        self.store.toggle_point(pos)
    }

    /// Finish a crop window drag; returns whether the window was kept.
    pub fn finish_crop(&mut self, window: CropWindow) -> bool {
        if self.raster.is_none() {
            return false;
        }
        self.store.add_crop_window(window)
    }

    // ========================================================================
    // Position import / export
    // ========================================================================

    /// Import a position CSV into the store.
    ///
    /// Geographic rows are converted through the raster's geotransform;
    /// positions outside the canvas are silently filtered. Returns the
    /// number of points added.
    pub fn import_positions(&mut self, csv: &str, mode: LoadMode) -> Result<usize> {
        if self.raster.is_none() {
            return Err(CoreError::invalid_config("no raster loaded"));
        }

        let ParsedPositions { kind, rows } = parse_positions(csv)?;
        let scale = self.scale_factor;
        let canvas: Vec<Point> = rows
            .iter()
            .map(|&(x, y)| {
                let (px, py) = match kind {
                    PositionKind::Pixel => (x, y),
                    PositionKind::Geographic => self.transform.to_pixel(x, y),
                };
                Point::new((px * scale) as f32, (py * scale) as f32)
            })
            .collect();

        let added = self.store.bulk_load(&canvas, mode);
        log::info!("imported {added} of {} positions ({kind:?})", rows.len());
        Ok(added)
    }

    /// Export the store's points as CSV payloads.
    ///
    /// Always produces the native-pixel CSV; georeferenced rasters also get
    /// the geographic CSV.
    pub fn export_positions(&self) -> Result<PositionExport> {
        if self.store.is_empty() {
            return Err(CoreError::empty_input("no points to save"));
        }

        let native: Vec<(i64, i64)> = self
            .store
            .all_points()
            .iter()
            .map(|p| {
                (
                    (p.x as f64 / self.scale_factor).round() as i64,
                    (p.y as f64 / self.scale_factor).round() as i64,
                )
            })
            .collect();

        let pixel_csv = crate::positions::format_pixel_positions(&native);
        let geo_csv = self.transform.is_georeferenced().then(|| {
            let rows: Vec<(f64, f64)> = native
                .iter()
                .map(|&(x, y)| self.transform.to_geo(x as f64, y as f64))
                .collect();
            crate::positions::format_geo_positions(&rows)
        });

        Ok(PositionExport { pixel_csv, geo_csv })
    }

    // ========================================================================
    // Dataset production
    // ========================================================================

    /// Writer parameters combining the session config with run arguments.
    pub fn writer_params(&self, train_ratio: f32, split_seed: u64, color_seed: u64) -> WriterParams {
        WriterParams {
            train_ratio,
            split_seed,
            color_seed,
            n_class: self.config.n_class,
            alpha: self.config.blend_alpha,
        }
    }

    /// Snapshot the annotation state in native pixels.
    pub fn snapshot(&self) -> SessionSnapshot {
        let (width, height) = match &self.raster {
            Some(r) => (r.width(), r.height()),
            None => (0, 0),
        };
        let scale = self.scale_factor;

        let points = self
            .store
            .all_points()
            .iter()
            .map(|p| {
                (
                    (p.x as f64 / scale).round() as i32,
                    (p.y as f64 / scale).round() as i32,
                )
            })
            .filter(|&(x, y)| x >= 0 && (x as u32) < width && y >= 0 && (y as u32) < height)
            .collect();

        let windows = self
            .store
            .all_crop_windows()
            .iter()
            .map(|w| w.scaled(1.0 / scale).clip_to(width, height))
            .collect();

        SessionSnapshot { points, windows }
    }

    /// Produce a dataset from the current annotations.
    ///
    /// Validates configuration eagerly, snapshots the store, burns the label
    /// mask, tiles the raster, and writes the dataset. Only one export may
    /// run at a time per session; a second call while one is in flight is
    /// rejected.
    pub fn produce_dataset(
        &self,
        split: &SplitParams,
        writer: &WriterParams,
        base_name: &str,
        out_dir: &Path,
    ) -> Result<DatasetManifest> {
        let _guard = self.try_begin_export()?;

        let Some(raster) = &self.raster else {
            return Err(CoreError::empty_input("no raster loaded"));
        };
        if self.store.is_empty() {
            return Err(CoreError::empty_input("no annotation points"));
        }

        // All validation happens before any raster read or write
        let (width, height) = (raster.width(), raster.height());
        split.validate(width as usize, height as usize)?;
        writer.validate()?;

        let snapshot = self.snapshot();
        for win in &snapshot.windows {
            if (win.width() as usize) < split.tile_size || (win.height() as usize) < split.tile_size
            {
                return Err(CoreError::invalid_config(format!(
                    "crop window {}x{} is smaller than the tile size {}",
                    win.width(),
                    win.height(),
                    split.tile_size
                )));
            }
        }

        log::info!(
            "producing dataset: {} points, {} windows, tile size {}",
            snapshot.points.len(),
            snapshot.windows.len(),
            split.tile_size
        );

        let rasterizer =
            LabelRasterizer::from_meters(self.config.point_radius_m, self.config.target_pixel_size);
        let mask = rasterizer.rasterize_points(width, height, &snapshot.points, 1);
        let image = raster.read_full();

        let tiles = tiler::split(&image, &mask, &snapshot.windows, split)?;
        DatasetWriter::new(*writer).write(&tiles, base_name, out_dir)
    }

    fn try_begin_export(&self) -> Result<ExportGuard<'_>> {
        if self.export_in_flight.swap(true, Ordering::SeqCst) {
            return Err(CoreError::ExportInProgress);
        }
        Ok(ExportGuard(&self.export_in_flight))
    }
}

/// Clears the in-flight flag when an export finishes or fails.
struct ExportGuard<'a>(&'a AtomicBool);

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::MemoryRaster;
    use ndarray::Array3;

    fn plain_raster(h: usize, w: usize, value: u8) -> Box<MemoryRaster> {
        Box::new(MemoryRaster::without_georeference(Array3::from_elem(
            (h, w, 3),
            value,
        )))
    }

    fn geo_raster(h: usize, w: usize, pixel_width: f64) -> Box<MemoryRaster> {
        let t = GeoTransform::new(1000.0, 2000.0, pixel_width, -pixel_width).unwrap();
        Box::new(MemoryRaster::new(Array3::from_elem((h, w, 3), 128), t))
    }

    fn session_with(raster: Box<MemoryRaster>) -> Session {
        let mut s = Session::new(SessionConfig::default());
        s.load_raster(raster).unwrap();
        s
    }

    #[test]
    fn test_ungeoreferenced_raster_keeps_identity_scale() {
        let s = session_with(plain_raster(100, 100, 1));
        assert_eq!(s.scale_factor(), 1.0);
    }

    #[test]
    fn test_coarse_raster_upscales_canvas() {
        // Native 0.1 m vs 0.05 m target doubles the canvas
        let mut s = session_with(geo_raster(100, 100, 0.1));
        assert!((s.scale_factor() - 2.0).abs() < 1e-9);

        // Canvas (120, 80) corresponds to native (60, 40)
        s.toggle_point_at(Point::new(120.0, 80.0));
        assert_eq!(s.snapshot().points, vec![(60, 40)]);
    }

    #[test]
    fn test_size_limit_reduces_scale() {
        let mut s = Session::new(SessionConfig {
            canvas_size_limit: 50,
            ..SessionConfig::default()
        });
        s.load_raster(plain_raster(100, 100, 1)).unwrap();
        assert!((s.scale_factor() - 0.5).abs() < 1e-9);

        // Canvas point beyond the shrunken canvas is ignored
        assert_eq!(s.toggle_point_at(Point::new(80.0, 10.0)), PointToggle::Ignored);
    }

    #[test]
    fn test_load_raster_clears_annotations() {
        let mut s = session_with(plain_raster(100, 100, 1));
        s.toggle_point_at(Point::new(10.0, 10.0));
        s.finish_crop(CropWindow::new(0, 0, 60, 60));

        s.load_raster(plain_raster(100, 100, 1)).unwrap();
        assert!(s.store().is_empty());
        assert_eq!(s.store().window_count(), 0);
    }

    #[test]
    fn test_import_pixel_positions() {
        let mut s = session_with(plain_raster(100, 100, 1));
        let added = s.import_positions("10,20\n30,40\n", LoadMode::Override).unwrap();
        assert_eq!(added, 2);
        assert_eq!(s.store().all_points()[0], Point::new(10.0, 20.0));
    }

    #[test]
    fn test_import_geographic_positions() {
        let mut s = session_with(geo_raster(100, 100, 0.05));
        // to_geo(50, 50) with origin (1000, 2000) and 0.05 m pixels
        let added = s.import_positions("1002.5,1997.5", LoadMode::Override).unwrap();
        assert_eq!(added, 1);
        assert_eq!(s.snapshot().points, vec![(50, 50)]);
    }

    #[test]
    fn test_import_filters_out_of_extent() {
        let mut s = session_with(plain_raster(100, 100, 1));
        let added = s
            .import_positions("10,10\n500,500\n-3,40", LoadMode::Override)
            .unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn test_import_without_raster_fails() {
        let mut s = Session::new(SessionConfig::default());
        assert!(s.import_positions("1,2", LoadMode::Override).is_err());
    }

    #[test]
    fn test_export_positions_pixel_and_geo() {
        let mut s = session_with(geo_raster(100, 100, 0.05));
        s.toggle_point_at(Point::new(50.0, 50.0));

        let export = s.export_positions().unwrap();
        assert_eq!(export.pixel_csv, "50,50");
        assert_eq!(export.geo_csv.as_deref(), Some("1002.5,1997.5"));
    }

    #[test]
    fn test_export_positions_empty_store_fails() {
        let s = session_with(plain_raster(100, 100, 1));
        assert!(matches!(
            s.export_positions(),
            Err(CoreError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_export_ungeoreferenced_has_no_geo_csv() {
        let mut s = session_with(plain_raster(100, 100, 1));
        s.toggle_point_at(Point::new(10.0, 10.0));
        assert_eq!(s.export_positions().unwrap().geo_csv, None);
    }

    #[test]
    fn test_export_guard_is_exclusive() {
        let s = session_with(plain_raster(100, 100, 1));
        let guard = s.try_begin_export().unwrap();
        assert!(matches!(
            s.try_begin_export(),
            Err(CoreError::ExportInProgress)
        ));
        drop(guard);
        assert!(s.try_begin_export().is_ok());
    }

    #[test]
    fn test_produce_dataset_without_points_fails() {
        let s = session_with(plain_raster(100, 100, 1));
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = s
            .produce_dataset(
                &SplitParams::new(50, 0.0),
                &s.writer_params(0.8, 0, 0),
                "t",
                dir.path(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyInput { .. }));
    }

    #[test]
    fn test_produce_dataset_rejects_small_crop_window() {
        let mut s = session_with(plain_raster(100, 100, 1));
        s.toggle_point_at(Point::new(50.0, 50.0));
        assert!(s.finish_crop(CropWindow::new(0, 0, 30, 30)));

        let dir = tempfile::tempdir().expect("create temp dir");
        let err = s
            .produce_dataset(
                &SplitParams::new(50, 0.0),
                &s.writer_params(0.8, 0, 0),
                "t",
                dir.path(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_produce_dataset_end_to_end() {
        // 100x100 raster, one point at (50, 50), disc radius 10 px
        // (0.5 m at the 0.05 m target), tile size 50, no overlap.
        let mut s = Session::new(SessionConfig {
            point_radius_m: 0.5,
            ..SessionConfig::default()
        });
        s.load_raster(plain_raster(100, 100, 90)).unwrap();
        s.toggle_point_at(Point::new(50.0, 50.0));

        let dir = tempfile::tempdir().expect("create temp dir");
        let split = SplitParams::new(50, 0.0).with_coverage_filter(0.01, 1.0);
        let manifest = s
            .produce_dataset(&split, &s.writer_params(0.8, 42, 42), "palm", dir.path())
            .unwrap();

        // The disc straddles all four tile corners, so every tile passes
        assert_eq!(manifest.all.len(), 4);
        assert_eq!(manifest.train.len(), 3);
        assert_eq!(manifest.val.len(), 1);
        assert!(dir.path().join("images/palm_0.png").exists());
        assert!(dir.path().join("labels/palm_3.png").exists());
        assert!(dir.path().join("visualization/palm_3.png").exists());

        // A tight coverage window drops the disc tiles instead
        let dir2 = tempfile::tempdir().expect("create temp dir");
        let split = SplitParams::new(50, 0.0).with_coverage_filter(0.5, 1.0);
        let err = s
            .produce_dataset(&split, &s.writer_params(0.8, 42, 42), "palm", dir2.path())
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyInput { .. }));
    }

    #[test]
    fn test_produce_dataset_scoped_to_crop_window() {
        let mut s = Session::new(SessionConfig {
            point_radius_m: 0.5,
            ..SessionConfig::default()
        });
        s.load_raster(plain_raster(100, 100, 90)).unwrap();
        s.toggle_point_at(Point::new(25.0, 25.0));
        assert!(s.finish_crop(CropWindow::new(0, 0, 50, 50)));

        let dir = tempfile::tempdir().expect("create temp dir");
        let manifest = s
            .produce_dataset(
                &SplitParams::new(50, 0.0),
                &s.writer_params(0.8, 0, 0),
                "t",
                dir.path(),
            )
            .unwrap();
        // One 50x50 window, one tile
        assert_eq!(manifest.all.len(), 1);
    }
}
