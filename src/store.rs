//! Annotation storage for one raster session.
//!
//! Owns the live set of point annotations and crop windows in scaled canvas
//! space, and resolves the interactive queries against them: toggle-merge on
//! double-click, batch de-duplication on file import, and
//! nearest-containing-window lookup for overlapping crop windows.

use crate::geometry::{CropWindow, Point};
use crate::spatial;

/// How a batch of loaded positions is combined with the current set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Append only positions farther than the close distance from every
    /// existing point.
    Insert,
    /// Replace the whole point set.
    Override,
}

/// Outcome of an interactive point toggle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointToggle {
    /// The point was added; nothing was within the merge radius.
    Added,
    /// An existing point within the merge radius was removed instead.
    Removed(Point),
    /// The position fell outside the canvas and was ignored.
    Ignored,
}

/// Canonical set of points and crop windows for the active raster.
///
/// All coordinates are in scaled canvas space. Thresholds are set in canvas
/// units by the session after it computes the scale factor.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    points: Vec<Point>,
    windows: Vec<CropWindow>,
    canvas_width: f32,
    canvas_height: f32,
    /// Distance below which an interactive toggle removes instead of adds.
    merge_radius: f32,
    /// De-duplication distance for batch inserts, distinct from the merge
    /// radius and typically larger.
    close_distance: f32,
    /// Minimum width/height a crop window must have to be kept.
    min_window_size: i32,
    /// Set on any mutation; the view layer mirrors the sequences and
    /// re-renders when it observes the flag.
    dirty: bool,
}

impl AnnotationStore {
    pub fn new(canvas_width: f32, canvas_height: f32) -> Self {
        Self {
            points: Vec::new(),
            windows: Vec::new(),
            canvas_width,
            canvas_height,
            merge_radius: 0.0,
            close_distance: 0.0,
            min_window_size: 1,
            dirty: true,
        }
    }

    /// Set the interactive toggle-merge radius, in canvas units.
    pub fn set_merge_radius(&mut self, radius: f32) {
        self.merge_radius = radius;
    }

    /// Set the batch-insert de-duplication distance, in canvas units.
    pub fn set_close_distance(&mut self, distance: f32) {
        self.close_distance = distance;
    }

    /// Set the minimum crop window edge length, in canvas units.
    pub fn set_min_window_size(&mut self, size: i32) {
        self.min_window_size = size;
    }

    /// Check if the store has been modified since last `clear_dirty`.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag. Call after re-rendering.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn in_bounds(&self, p: &Point) -> bool {
        p.x >= 0.0 && p.x < self.canvas_width && p.y >= 0.0 && p.y < self.canvas_height
    }

    // ========================================================================
    // Points
    // ========================================================================

    /// Toggle a point under pointer interaction.
    ///
    /// If the nearest existing point lies within the merge radius it is
    /// removed, otherwise `p` is inserted. After any toggle no two points are
    /// closer than the merge radius.
    pub fn toggle_point(&mut self, p: Point) -> PointToggle {
        if !self.in_bounds(&p) {
            return PointToggle::Ignored;
        }

        if let Some((idx, dist)) = spatial::nearest(&self.points, &p)
            && dist <= self.merge_radius
        {
            let removed = self.points.remove(idx);
            self.mark_dirty();
            return PointToggle::Removed(removed);
        }

        self.points.push(p);
        self.mark_dirty();
        PointToggle::Added
    }

    /// Remove the exact point `p` if present.
    pub fn remove_point(&mut self, p: &Point) -> bool {
        if let Some(idx) = self.points.iter().position(|q| q == p) {
            self.points.remove(idx);
            self.mark_dirty();
            true
        } else {
            false
        }
    }

    /// Clear all points.
    pub fn clear_points(&mut self) {
        if !self.points.is_empty() {
            self.mark_dirty();
        }
        self.points.clear();
    }

    /// Load a batch of positions from file import.
    ///
    /// Positions outside the canvas are silently dropped. `Override` replaces
    /// the whole set; `Insert` appends only positions farther than the close
    /// distance from every pre-existing point. Returns the number of points
    /// actually added.
    pub fn bulk_load(&mut self, positions: &[Point], mode: LoadMode) -> usize {
        if mode == LoadMode::Override {
            self.points.clear();
        }

        // De-duplicate against the pre-existing set only, not within the batch
        let existing = match mode {
            LoadMode::Insert => self.points.len(),
            LoadMode::Override => 0,
        };

        let mut added = 0;
        for p in positions {
            if !self.in_bounds(p) {
                continue;
            }
            if mode == LoadMode::Insert
                && spatial::has_neighbor_within(&self.points[..existing], p, self.close_distance)
            {
                continue;
            }
            self.points.push(*p);
            added += 1;
        }

        log::debug!(
            "bulk_load: {added} of {} positions kept ({mode:?})",
            positions.len()
        );
        self.mark_dirty();
        added
    }

    /// All points in insertion order.
    pub fn all_points(&self) -> &[Point] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Check if there are no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    // ========================================================================
    // Crop windows
    // ========================================================================

    /// Add a crop window on drag release.
    ///
    /// The window is normalized and clipped to the canvas; windows below the
    /// minimum size (click noise rather than a deliberate drag) are discarded.
    /// Returns whether the window was kept.
    pub fn add_crop_window(&mut self, window: CropWindow) -> bool {
        let win = window
            .normalized()
            .clip_to(self.canvas_width as u32, self.canvas_height as u32);

        if win.width() < self.min_window_size || win.height() < self.min_window_size {
            log::debug!(
                "discarding trivial crop window {}x{}",
                win.width(),
                win.height()
            );
            return false;
        }

        self.windows.push(win);
        self.mark_dirty();
        true
    }

    /// Remove a crop window by index.
    pub fn remove_crop_window(&mut self, index: usize) -> Option<CropWindow> {
        if index < self.windows.len() {
            self.mark_dirty();
            Some(self.windows.remove(index))
        } else {
            None
        }
    }

    /// Clear all crop windows.
    pub fn clear_windows(&mut self) {
        if !self.windows.is_empty() {
            self.mark_dirty();
        }
        self.windows.clear();
    }

    /// Find the crop window containing `pos` whose center is closest to it.
    ///
    /// Overlapping windows are permitted, so the first containing window is
    /// not necessarily the intended one.
    pub fn nearest_crop_window_containing(&self, pos: &Point) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, win) in self.windows.iter().enumerate() {
            if !win.contains(pos) {
                continue;
            }
            let dist = win.center().distance_to(pos);
            match best {
                Some((_, d)) if dist >= d => {}
                _ => best = Some((i, dist)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// All crop windows in creation order.
    pub fn all_crop_windows(&self) -> &[CropWindow] {
        &self.windows
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}
