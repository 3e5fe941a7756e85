//! Dataset persistence and the train/validation split.
//!
//! Writes surviving tiles under a three-directory layout as PNG, with an
//! alpha-blended visualization per tile, then partitions the written names
//! into reproducible train/val manifests.

use std::path::Path;

use image::{GrayImage, RgbImage};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{CoreError, Result};
use crate::tiler::Tile;

/// Output directory names. Configuration, not contract.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub images_dir: String,
    pub labels_dir: String,
    pub visualization_dir: String,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            images_dir: "images".to_string(),
            labels_dir: "labels".to_string(),
            visualization_dir: "visualization".to_string(),
        }
    }
}

/// Parameters for one dataset write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriterParams {
    /// Fraction of tiles assigned to the training subset.
    pub train_ratio: f32,
    /// Seed for the train/val shuffle.
    pub split_seed: u64,
    /// Seed for the per-class visualization palette.
    pub color_seed: u64,
    /// Number of label classes (excluding background).
    pub n_class: usize,
    /// Blend weight of the label overlay in visualizations.
    pub alpha: f32,
}

impl Default for WriterParams {
    fn default() -> Self {
        Self {
            train_ratio: 0.8,
            split_seed: 0,
            color_seed: 0,
            n_class: 1,
            alpha: 0.6,
        }
    }
}

impl WriterParams {
    /// Eager validation, before any directory is created.
    pub fn validate(&self) -> Result<()> {
        if !(0.5..=1.0).contains(&self.train_ratio) {
            return Err(CoreError::invalid_config(format!(
                "train ratio must be in [0.5, 1], got {}",
                self.train_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(CoreError::invalid_config(format!(
                "blend alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if self.n_class == 0 {
            return Err(CoreError::invalid_config("class count must be positive"));
        }
        Ok(())
    }
}

/// The train/validation partition of one dataset-production run.
///
/// Created once per run and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetManifest {
    /// Base names in the training subset.
    pub train: Vec<String>,
    /// Base names in the validation subset.
    pub val: Vec<String>,
    /// All written base names in write order.
    pub all: Vec<String>,
}

/// Writes tiles and manifests to a dataset directory.
#[derive(Debug, Clone, Default)]
pub struct DatasetWriter {
    layout: DatasetLayout,
    params: WriterParams,
}

impl DatasetWriter {
    pub fn new(params: WriterParams) -> Self {
        Self {
            layout: DatasetLayout::default(),
            params,
        }
    }

    pub fn with_layout(mut self, layout: DatasetLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Write all surviving tiles under `out_dir` and build the split.
    ///
    /// Tiles whose image is entirely zero are skipped regardless of any
    /// coverage filter. Surviving tiles are named `{base_name}_{i}` with a
    /// gap-free index. A failed write aborts the loop; the manifests are
    /// only written once every tile write has succeeded.
    pub fn write(&self, tiles: &[Tile], base_name: &str, out_dir: &Path) -> Result<DatasetManifest> {
        self.params.validate()?;

        let images_dir = out_dir.join(&self.layout.images_dir);
        let labels_dir = out_dir.join(&self.layout.labels_dir);
        let visual_dir = out_dir.join(&self.layout.visualization_dir);
        std::fs::create_dir_all(&images_dir)?;
        std::fs::create_dir_all(&labels_dir)?;
        std::fs::create_dir_all(&visual_dir)?;

        let palette = class_palette(self.params.color_seed, self.params.n_class);

        let mut names = Vec::new();
        for tile in tiles {
            if tile.is_blank() {
                continue;
            }

            let name = format!("{base_name}_{}", names.len());
            let im = to_rgb_image(&tile.image)?;
            let lb = to_gray_image(&tile.label)?;
            let vs = blend_visualization(&tile.image, &tile.label, &palette, self.params.alpha)?;

            im.save(images_dir.join(format!("{name}.png")))?;
            lb.save(labels_dir.join(format!("{name}.png")))?;
            vs.save(visual_dir.join(format!("{name}.png")))?;
            names.push(name);
        }

        if names.is_empty() {
            return Err(CoreError::empty_input("no tiles survived filtering"));
        }
        log::info!("wrote {} tiles to {:?}", names.len(), out_dir);

        let (train, val) = split_train_val(&names, self.params.train_ratio, self.params.split_seed);
        std::fs::write(out_dir.join("train.txt"), train.join("\n"))?;
        std::fs::write(out_dir.join("val.txt"), val.join("\n"))?;
        std::fs::write(out_dir.join("trainval.txt"), names.join("\n"))?;

        Ok(DatasetManifest {
            train,
            val,
            all: names,
        })
    }
}

/// Deterministic per-class visualization colors.
pub fn class_palette(seed: u64, n_class: usize) -> Vec<[u8; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_class).map(|_| rng.r#gen()).collect()
}

/// Shuffle the names with a seeded RNG and split at `floor(N * ratio)`.
pub fn split_train_val(names: &[String], ratio: f32, seed: u64) -> (Vec<String>, Vec<String>) {
    let mut shuffled = names.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let train_num = (names.len() as f32 * ratio) as usize;
    let val = shuffled.split_off(train_num);
    (shuffled, val)
}

fn to_rgb_image(image: &Array3<u8>) -> Result<RgbImage> {
    let (h, w, c) = image.dim();
    if c != 3 {
        return Err(CoreError::invalid_config(format!(
            "expected 3-channel tiles, got {c}"
        )));
    }
    let raw: Vec<u8> = image.as_standard_layout().iter().copied().collect();
    RgbImage::from_raw(w as u32, h as u32, raw)
        .ok_or_else(|| CoreError::invalid_config("tile buffer does not match dimensions"))
}

fn to_gray_image(label: &Array2<u8>) -> Result<GrayImage> {
    let (h, w) = label.dim();
    let raw: Vec<u8> = label.as_standard_layout().iter().copied().collect();
    GrayImage::from_raw(w as u32, h as u32, raw)
        .ok_or_else(|| CoreError::invalid_config("label buffer does not match dimensions"))
}

/// Alpha-blend the class colors over the source tile.
///
/// Background pixels (label 0) show the source image unchanged.
fn blend_visualization(
    image: &Array3<u8>,
    label: &Array2<u8>,
    palette: &[[u8; 3]],
    alpha: f32,
) -> Result<RgbImage> {
    let (h, w, c) = image.dim();
    if c != 3 {
        return Err(CoreError::invalid_config(format!(
            "expected 3-channel tiles, got {c}"
        )));
    }

    let mut out = RgbImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let class = label[[y, x]] as usize;
            let src = [image[[y, x, 0]], image[[y, x, 1]], image[[y, x, 2]]];
            let px = if class == 0 || class > palette.len() {
                src
            } else {
                let color = palette[class - 1];
                [
                    (color[0] as f32 * alpha + src[0] as f32 * (1.0 - alpha)) as u8,
                    (color[1] as f32 * alpha + src[1] as f32 * (1.0 - alpha)) as u8,
                    (color[2] as f32 * alpha + src[2] as f32 * (1.0 - alpha)) as u8,
                ]
            };
            out.put_pixel(x as u32, y as u32, image::Rgb(px));
        }
    }
    Ok(out)
}
