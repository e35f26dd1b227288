//! Objectness detection: a coarse sliding-window filter on depth edges.
//!
//! The normalized depth map is turned into a binary edge mask (Sobel
//! magnitude inside `[t_min, t_max]`), summed once into an integral image,
//! and every window of the smallest template size is scored in O(1). A
//! window is kept when it holds at least `min_edgels * edgel_factor` edge
//! pixels, where `min_edgels` is learned from the template library.

use crate::candidate::Window;
use crate::geometry::Rect;
use crate::image::filters::sobel_magnitude;
use crate::image::{Grid, IntegralImage};
use crate::template::TemplateLibrary;
use crate::trace::{trace_event, trace_span};
use crate::util::{HashMatchError, HashMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Configuration for objectness detection.
#[derive(Clone, Debug)]
pub struct ObjectnessConfig {
    /// Stride of the sliding window in both axes, in pixels.
    pub window_step: usize,
    /// Minimum normalized Sobel magnitude of an edge pixel.
    pub t_min: f32,
    /// Maximum normalized Sobel magnitude of an edge pixel.
    pub t_max: f32,
    /// Fraction of the trained minimum edge count a window must reach.
    pub edgel_factor: f32,
    /// Factor turning raw template depth into the scene's normalized range.
    ///
    /// `min_edgels` is learned on template depth scaled by this factor, so
    /// scenes must be normalized with the same factor. `Detector::detect`
    /// rejects scenes built by `Scene::from_raw_depth` with another scale.
    pub depth_scale: f32,
}

impl Default for ObjectnessConfig {
    fn default() -> Self {
        Self {
            window_step: 5,
            t_min: 0.01,
            t_max: 0.1,
            edgel_factor: 0.3,
            depth_scale: 1.0 / 65536.0,
        }
    }
}

impl ObjectnessConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> HashMatchResult<()> {
        if self.window_step == 0 {
            return Err(HashMatchError::config("window_step", "must be > 0"));
        }
        if !(self.t_min.is_finite() && self.t_min > 0.0) {
            return Err(HashMatchError::config("t_min", "must be finite and > 0"));
        }
        if !(self.t_max.is_finite() && self.t_max > self.t_min) {
            return Err(HashMatchError::config("t_max", "must be > t_min"));
        }
        if !(self.edgel_factor.is_finite() && self.edgel_factor > 0.0) {
            return Err(HashMatchError::config("edgel_factor", "must be finite and > 0"));
        }
        if !(self.depth_scale.is_finite() && self.depth_scale > 0.0) {
            return Err(HashMatchError::config("depth_scale", "must be finite and > 0"));
        }
        Ok(())
    }
}

/// Quantities learned from the template library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectnessModel {
    /// Size of the smallest template bounding box.
    pub window_width: usize,
    pub window_height: usize,
    /// Fewest edge pixels found inside any template bounding box.
    pub min_edgels: u32,
}

/// Binary edge mask of a normalized depth map (1 = edgel).
pub fn edge_mask(depth_norm: &Grid<f32>, t_min: f32, t_max: f32) -> Grid<u8> {
    sobel_magnitude(depth_norm).map(|m| u8::from(m >= t_min && m <= t_max))
}

/// Sliding-window objectness filter.
#[derive(Clone, Debug)]
pub struct ObjectnessDetector {
    cfg: ObjectnessConfig,
    model: Option<ObjectnessModel>,
}

impl ObjectnessDetector {
    /// Creates an untrained detector.
    pub fn new(cfg: ObjectnessConfig) -> HashMatchResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg, model: None })
    }

    /// Creates a detector from a previously learned model.
    pub fn with_model(cfg: ObjectnessConfig, model: ObjectnessModel) -> HashMatchResult<Self> {
        cfg.validate()?;
        if model.min_edgels == 0 || model.window_width == 0 || model.window_height == 0 {
            return Err(HashMatchError::config("objectness model", "must be non-empty"));
        }
        Ok(Self {
            cfg,
            model: Some(model),
        })
    }

    pub fn config(&self) -> &ObjectnessConfig {
        &self.cfg
    }

    /// Learned model, `None` before training.
    pub fn model(&self) -> Option<&ObjectnessModel> {
        self.model.as_ref()
    }

    /// Learns the window size and the minimum edge count.
    ///
    /// A template without a single depth edge inside its bounding box would
    /// let every window through, so it fails training.
    pub fn train(&mut self, library: &TemplateLibrary) -> HashMatchResult<ObjectnessModel> {
        let _span = trace_span!("objectness_train", templates = library.len()).entered();
        let smallest = library.smallest().ok_or(HashMatchError::EmptyTemplateSet)?;
        let bbox = smallest.bbox();

        let mut min_edgels = u32::MAX;
        for template in library.templates() {
            let edgels = self.template_edgels(&template.source().depth, template.bbox())?;
            if edgels == 0 {
                return Err(HashMatchError::DegenerateTemplate {
                    template: template.id().0,
                    reason: "no depth edges inside bounding box",
                });
            }
            min_edgels = min_edgels.min(edgels);
        }

        let model = ObjectnessModel {
            window_width: bbox.width,
            window_height: bbox.height,
            min_edgels,
        };
        trace_event!(
            "objectness_trained",
            min_edgels = model.min_edgels,
            window_width = model.window_width,
            window_height = model.window_height
        );
        self.model = Some(model);
        Ok(model)
    }

    /// Edge pixels inside `bbox`, with the mask computed on the whole render
    /// so contour pixels on the box border count the same way as in a scene.
    fn template_edgels(&self, depth: &Grid<f32>, bbox: Rect) -> HashMatchResult<u32> {
        let norm = depth.map(|d| {
            if d.is_finite() {
                (d * self.cfg.depth_scale).clamp(0.0, 1.0)
            } else {
                0.0
            }
        });
        let mask = edge_mask(&norm, self.cfg.t_min, self.cfg.t_max);
        let crop = mask.view().roi(bbox)?;
        let mut edgels = 0u32;
        for y in 0..crop.height() {
            if let Some(row) = crop.row(y) {
                edgels += row.iter().map(|&v| u32::from(v)).sum::<u32>();
            }
        }
        Ok(edgels)
    }

    /// Edge-count threshold a window must reach.
    pub fn threshold(&self) -> HashMatchResult<f32> {
        let model = self.model.ok_or(HashMatchError::NotTrained {
            stage: "objectness",
        })?;
        Ok(model.min_edgels as f32 * self.cfg.edgel_factor)
    }

    /// Scans the scene and returns the windows worth hashing.
    ///
    /// Only windows that fit entirely inside the scene are visited. An empty
    /// result is a valid outcome.
    pub fn detect(&self, depth_norm: &Grid<f32>, parallel: bool) -> HashMatchResult<Vec<Window>> {
        let model = self.model.ok_or(HashMatchError::NotTrained {
            stage: "objectness",
        })?;
        let threshold = self.threshold()?;
        let _span = trace_span!(
            "objectness",
            width = depth_norm.width(),
            height = depth_norm.height()
        )
        .entered();

        let mask = edge_mask(depth_norm, self.cfg.t_min, self.cfg.t_max);
        let integral = IntegralImage::from_mask(&mask);
        let (w, h) = (model.window_width, model.window_height);
        if w > depth_norm.width() || h > depth_norm.height() {
            trace_event!("objectness_windows", count = 0usize);
            return Ok(Vec::new());
        }
        let rows: Vec<usize> = (0..=depth_norm.height() - h)
            .step_by(self.cfg.window_step)
            .collect();
        let max_x = depth_norm.width() - w;
        let step = self.cfg.window_step;

        let scan_row = |&y: &usize| -> Vec<Window> {
            (0..=max_x)
                .step_by(step)
                .filter_map(|x| {
                    let rect = Rect::new(x, y, w, h);
                    let edgels = integral.sum(rect)?;
                    (edgels as f32 >= threshold).then(|| Window::new(rect, edgels))
                })
                .collect()
        };

        #[cfg(feature = "rayon")]
        let per_row: Vec<Vec<Window>> = if parallel {
            rows.par_iter().map(scan_row).collect()
        } else {
            rows.iter().map(scan_row).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let per_row: Vec<Vec<Window>> = {
            let _ = parallel;
            rows.iter().map(scan_row).collect()
        };

        let windows: Vec<Window> = per_row.into_iter().flatten().collect();
        trace_event!("objectness_windows", count = windows.len());
        Ok(windows)
    }
}
