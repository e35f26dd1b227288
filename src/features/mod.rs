//! Feature extraction for templates.
//!
//! For every template a fixed number of edge points and stable points is
//! sampled. Edge points carry a quantized gradient orientation; stable points
//! carry a quantized surface normal, the raw depth and the HSV color. The
//! sample is drawn from an explicitly passed random source so a training run
//! is repeatable for a given seed.

mod edges;
pub mod quantize;

pub use edges::{canny, stable_mask};
pub use quantize::{
    gradient_at, gradient_orientation_deg, normal_bin_at, quantize_normal, quantize_orientation,
    surface_normal, INVALID_BIN, NORMAL_BINS, ORIENTATION_BINS,
};

use crate::geometry::{Point, Rect};
use crate::image::filters::box_blur3;
use crate::image::{Grid, Hsv};
use crate::template::TemplateSource;
use crate::util::math::median_f32;
use crate::util::{HashMatchError, HashMatchResult};
use rand::Rng;

/// Configuration for template feature extraction.
#[derive(Clone, Debug)]
pub struct FeatureConfig {
    /// Number of edge points and of stable points sampled per template.
    pub feature_point_count: usize,
    /// Lower hysteresis threshold on the L1 Sobel magnitude.
    pub canny_low: f32,
    /// Upper hysteresis threshold on the L1 Sobel magnitude.
    pub canny_high: f32,
    /// Maximum 8-bit Sobel response of a stable point.
    pub sobel_max: u8,
    /// Minimum 8-bit intensity of a stable point.
    pub grayscale_min: u8,
    /// Grayscale gradients weaker than this carry no orientation, on the
    /// template and on the scene side alike.
    pub min_gradient_magnitude: f32,
    /// Seed of the point-sampling random source.
    pub seed: u64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            feature_point_count: 100,
            canny_low: 100.0,
            canny_high: 200.0,
            sobel_max: 50,
            grayscale_min: 50,
            min_gradient_magnitude: 0.1,
            seed: 1,
        }
    }
}

impl FeatureConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> HashMatchResult<()> {
        if self.feature_point_count == 0 {
            return Err(HashMatchError::config("feature_point_count", "must be > 0"));
        }
        if !(self.canny_low.is_finite() && self.canny_low > 0.0) {
            return Err(HashMatchError::config("canny_low", "must be finite and > 0"));
        }
        if !(self.canny_high.is_finite() && self.canny_high >= self.canny_low) {
            return Err(HashMatchError::config("canny_high", "must be >= canny_low"));
        }
        if self.sobel_max == 0 {
            return Err(HashMatchError::config("sobel_max", "must be > 0"));
        }
        if !(self.min_gradient_magnitude.is_finite() && self.min_gradient_magnitude >= 0.0) {
            return Err(HashMatchError::config(
                "min_gradient_magnitude",
                "must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// All pixels that qualify as edge or stable points of a template.
#[derive(Clone, Debug, Default)]
pub struct PointSets {
    pub edges: Vec<Point>,
    pub stable: Vec<Point>,
}

/// Quantized descriptors of one template.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateFeatures {
    pub edge_points: Vec<Point>,
    pub stable_points: Vec<Point>,
    /// Orientation bin per edge point, in [0, 5).
    pub gradients: Vec<u8>,
    /// Normal bin per stable point, in [0, 8).
    pub normals: Vec<u8>,
    /// Raw depth per stable point.
    pub depths: Vec<f32>,
    /// HSV per stable point.
    pub colors: Vec<Hsv>,
    /// Median of `depths`.
    pub median_depth: f32,
}

impl TemplateFeatures {
    pub fn len(&self) -> usize {
        self.stable_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stable_points.is_empty()
    }
}

/// Collects every qualifying edge and stable pixel inside the bounding box.
///
/// Pixels on the image border are skipped since their descriptors need a
/// full neighbourhood. Edge pixels additionally need a grayscale gradient of
/// at least `min_gradient_magnitude`, stable pixels a valid depth normal.
pub fn qualifying_points(source: &TemplateSource, cfg: &FeatureConfig) -> PointSets {
    let blurred = box_blur3(&to_gray8(&source.gray));
    let edges = canny(&blurred, cfg.canny_low, cfg.canny_high);
    let stable = stable_mask(&blurred, cfg.grayscale_min, cfg.sobel_max);

    let inner = interior(source.bbox, source.gray.width(), source.gray.height());
    let mut sets = PointSets::default();
    for y in inner.y..inner.y + inner.height {
        for x in inner.x..inner.x + inner.width {
            let oriented = gradient_at(&source.gray, x, y)
                .is_some_and(|(_, magnitude)| magnitude >= cfg.min_gradient_magnitude);
            if edges.at(x, y) && oriented {
                sets.edges.push(Point::new(x, y));
            }
            if stable.at(x, y) && normal_bin_at(&source.depth, x, y).is_some() {
                sets.stable.push(Point::new(x, y));
            }
        }
    }
    sets
}

/// Bounding box shrunk to exclude the one-pixel image border.
fn interior(bbox: Rect, width: usize, height: usize) -> Rect {
    let x0 = bbox.x.max(1);
    let y0 = bbox.y.max(1);
    let x1 = (bbox.x + bbox.width).min(width.saturating_sub(1));
    let y1 = (bbox.y + bbox.height).min(height.saturating_sub(1));
    Rect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

/// Draws `count` distinct points with the supplied random source.
pub fn sample_points<R: Rng + ?Sized>(points: &[Point], count: usize, rng: &mut R) -> Vec<Point> {
    rand::seq::index::sample(rng, points.len(), count.min(points.len()))
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Computes the descriptors at already selected points.
///
/// Edge points are expected to come from `qualifying_points`; one without a
/// measurable gradient falls into orientation bin 0.
pub fn describe(
    source: &TemplateSource,
    edge_points: Vec<Point>,
    stable_points: Vec<Point>,
) -> TemplateFeatures {
    let gradients = edge_points
        .iter()
        .map(|p| gradient_at(&source.gray, p.x, p.y).map_or(0, |(bin, _)| bin))
        .collect();
    let normals = stable_points
        .iter()
        .map(|p| normal_bin_at(&source.depth, p.x, p.y).unwrap_or(INVALID_BIN))
        .collect();
    let depths: Vec<f32> = stable_points
        .iter()
        .map(|p| source.depth.at(p.x, p.y))
        .collect();
    let colors = stable_points
        .iter()
        .map(|p| source.hsv.at(p.x, p.y))
        .collect();
    let mut sorted = depths.clone();
    let median_depth = median_f32(&mut sorted).unwrap_or(0.0);
    TemplateFeatures {
        edge_points,
        stable_points,
        gradients,
        normals,
        depths,
        colors,
        median_depth,
    }
}

/// Extracts the features of template `index`.
///
/// Fails with `InsufficientFeaturePoints` when either point kind has fewer
/// qualifying pixels than `cfg.feature_point_count`.
pub fn extract_features<R: Rng + ?Sized>(
    source: &TemplateSource,
    index: usize,
    cfg: &FeatureConfig,
    rng: &mut R,
) -> HashMatchResult<TemplateFeatures> {
    let sets = qualifying_points(source, cfg);
    let required = cfg.feature_point_count;
    for (kind, found) in [("edge", sets.edges.len()), ("stable", sets.stable.len())] {
        if found < required {
            return Err(HashMatchError::InsufficientFeaturePoints {
                template: index,
                kind,
                found,
                required,
            });
        }
    }
    let stable_points = sample_points(&sets.stable, required, rng);
    let edge_points = sample_points(&sets.edges, required, rng);
    Ok(describe(source, edge_points, stable_points))
}

/// Converts a [0, 1] grayscale grid to 8 bits with rounding and saturation.
pub fn to_gray8(gray: &Grid<f32>) -> Grid<u8> {
    gray.map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
}
