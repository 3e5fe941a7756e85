//! anntile — annotation and dataset-tiling core for geo-referenced rasters.
//!
//! This crate is the engine behind a raster labeling tool: it maintains
//! point and crop-window annotations over a zoomable canvas, answers the
//! interactive nearest-neighbor and containment queries against them, burns
//! annotations into label masks, and slices raster/mask pairs into
//! overlapping, coverage-filtered training tiles with a reproducible
//! train/validation split. The GUI shell, rendering, and the concrete
//! geo-raster decoder are external collaborators behind [`RasterSource`]
//! and the [`Session`] facade.

pub mod config;
pub mod dataset;
pub mod error;
pub mod geo;
pub mod geometry;
pub mod positions;
pub mod raster;
pub mod rasterize;
pub mod session;
pub mod spatial;
pub mod store;
pub mod tiler;

pub use config::SessionConfig;
pub use dataset::{DatasetLayout, DatasetManifest, DatasetWriter, WriterParams};
pub use error::{CoreError, Result};
pub use geo::GeoTransform;
pub use geometry::{CropWindow, Point, Polygon};
pub use raster::{MemoryRaster, RasterSource};
pub use rasterize::LabelRasterizer;
pub use session::{PositionExport, Session, SessionSnapshot};
pub use store::{AnnotationStore, LoadMode, PointToggle};
pub use tiler::{SplitParams, Tile};
