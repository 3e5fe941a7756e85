//! Session configuration.
//!
//! Every threshold that was historically a mutable module-level constant is
//! an explicit field here, passed in per session. Values serialize to JSON
//! so a front end can persist user settings.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for one annotation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pixel size the canvas is resampled to, in meters.
    #[serde(default = "default_target_pixel_size")]
    pub target_pixel_size: f64,

    /// Maximum canvas dimension in pixels; larger rasters are scaled down.
    #[serde(default = "default_canvas_size_limit")]
    pub canvas_size_limit: u32,

    /// Toggle-merge radius for interactive point placement, in meters.
    #[serde(default = "default_merge_radius_m")]
    pub merge_radius_m: f64,

    /// De-duplication distance for batch position imports, in meters.
    /// Distinct from the merge radius, and typically larger.
    #[serde(default = "default_close_distance_m")]
    pub close_distance_m: f64,

    /// Minimum crop window edge length, in native pixels.
    #[serde(default = "default_min_window_size")]
    pub min_window_size: u32,

    /// Radius of the disc burned around each point, in meters.
    #[serde(default = "default_point_radius_m")]
    pub point_radius_m: f64,

    /// Blend weight of the label overlay in visualization tiles.
    #[serde(default = "default_blend_alpha")]
    pub blend_alpha: f32,

    /// Number of label classes (excluding background).
    #[serde(default = "default_n_class")]
    pub n_class: usize,
}

fn default_target_pixel_size() -> f64 {
    0.05
}

fn default_canvas_size_limit() -> u32 {
    16000
}

fn default_merge_radius_m() -> f64 {
    1.0
}

fn default_close_distance_m() -> f64 {
    2.0
}

fn default_min_window_size() -> u32 {
    10
}

fn default_point_radius_m() -> f64 {
    1.5
}

fn default_blend_alpha() -> f32 {
    0.6
}

fn default_n_class() -> usize {
    1
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_pixel_size: default_target_pixel_size(),
            canvas_size_limit: default_canvas_size_limit(),
            merge_radius_m: default_merge_radius_m(),
            close_distance_m: default_close_distance_m(),
            min_window_size: default_min_window_size(),
            point_radius_m: default_point_radius_m(),
            blend_alpha: default_blend_alpha(),
            n_class: default_n_class(),
        }
    }
}

impl SessionConfig {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON; missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
