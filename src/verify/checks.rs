//! The five verification tests.
//!
//! Each test maps template points into the scene relative to the window
//! origin and returns a score in [0, 1]; the caller compares it against its
//! threshold.

use crate::features::{NORMAL_BINS, ORIENTATION_BINS};
use crate::geometry::{Point, Rect};
use crate::scene::{Scene, SceneFeatures};
use crate::template::Template;
use crate::util::math::{circular_bin_distance, finite_or, is_valid_depth, median_f32};
use crate::verify::color::{colors_agree, normalize_hsv};
use crate::verify::{VerifyConfig, MAX_NEIGHBOURHOOD_RADIUS};

/// Outcome of one test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Check {
    pub score: f32,
    pub passed: bool,
}

impl Check {
    fn fraction(agreeing: usize, total: usize, t_match: f32) -> Self {
        let score = if total == 0 {
            0.0
        } else {
            agreeing as f32 / total as f32
        };
        Self {
            score,
            passed: total > 0 && score >= t_match,
        }
    }
}

/// Scene position of template point `p` for a window at `window`.
#[inline]
pub(crate) fn to_scene(p: Point, bbox: Rect, window: Rect) -> (i64, i64) {
    (
        window.x as i64 + p.x as i64 - bbox.x as i64,
        window.y as i64 + p.y as i64 - bbox.y as i64,
    )
}

/// Majority vote over the `radius` neighbourhood of `(cx, cy)`.
///
/// `measure` returns `None` for pixels without a usable measurement. The point
/// passes iff agreeing pixels are a strict majority of the measured ones.
/// `radius` is clamped to `MAX_NEIGHBOURHOOD_RADIUS`.
pub(crate) fn neighbourhood_agrees(
    cx: i64,
    cy: i64,
    radius: usize,
    mut measure: impl FnMut(i64, i64) -> Option<bool>,
) -> bool {
    let r = radius.min(MAX_NEIGHBOURHOOD_RADIUS) as i64;
    let mut qualified = 0u32;
    let mut agreeing = 0u32;
    for y in cy - r..=cy + r {
        for x in cx - r..=cx + r {
            if let Some(ok) = measure(x, y) {
                qualified += 1;
                agreeing += u32::from(ok);
            }
        }
    }
    qualified > 0 && 2 * agreeing > qualified
}

fn scene_depth(scene: &Scene, x: i64, y: i64) -> Option<f32> {
    scene.depth().get_signed(x, y).filter(|&d| is_valid_depth(d))
}

/// Template median depth against scene median depth at the stable points.
pub fn object_size(scene: &Scene, template: &Template, window: Rect, cfg: &VerifyConfig) -> Check {
    let features = template.features();
    let mut depths: Vec<f32> = features
        .stable_points
        .iter()
        .filter_map(|&p| {
            let (x, y) = to_scene(p, template.bbox(), window);
            scene_depth(scene, x, y)
        })
        .collect();
    let Some(scene_median) = median_f32(&mut depths) else {
        return Check {
            score: 0.0,
            passed: false,
        };
    };
    let scale = finite_or(features.median_depth / scene_median, 0.0);
    let error = (scale - 1.0).abs();
    Check {
        score: (1.0 - error).clamp(0.0, 1.0),
        passed: error <= cfg.object_size_tolerance,
    }
}

/// Normal bins at stable points within `normal_bin_tolerance`.
pub fn surface_normal(
    features: &SceneFeatures,
    template: &Template,
    window: Rect,
    cfg: &VerifyConfig,
) -> Check {
    let tf = template.features();
    let agreeing = tf
        .stable_points
        .iter()
        .zip(&tf.normals)
        .filter(|&(&p, &bin)| {
            let (x, y) = to_scene(p, template.bbox(), window);
            neighbourhood_agrees(x, y, cfg.neighbourhood_radius, |sx, sy| {
                features
                    .normal_bin(sx, sy)
                    .map(|b| circular_bin_distance(b, bin, NORMAL_BINS) <= cfg.normal_bin_tolerance)
            })
        })
        .count();
    Check::fraction(agreeing, tf.len(), cfg.t_match)
}

/// Orientation bins at edge points within `gradient_bin_tolerance`.
pub fn gradient(
    features: &SceneFeatures,
    template: &Template,
    window: Rect,
    cfg: &VerifyConfig,
) -> Check {
    let tf = template.features();
    let agreeing = tf
        .edge_points
        .iter()
        .zip(&tf.gradients)
        .filter(|&(&p, &bin)| {
            let (x, y) = to_scene(p, template.bbox(), window);
            neighbourhood_agrees(x, y, cfg.neighbourhood_radius, |sx, sy| {
                features.gradient_bin(sx, sy).map(|b| {
                    circular_bin_distance(b, bin, ORIENTATION_BINS) <= cfg.gradient_bin_tolerance
                })
            })
        })
        .count();
    Check::fraction(agreeing, tf.edge_points.len(), cfg.t_match)
}

/// Depth offsets at stable points against their median offset.
///
/// A point agrees iff its offset is within `depth_tolerance * diameter` of
/// the median; points without scene depth count as disagreeing.
pub fn depth(scene: &Scene, template: &Template, window: Rect, cfg: &VerifyConfig) -> Check {
    let tf = template.features();
    let offsets: Vec<f32> = tf
        .stable_points
        .iter()
        .zip(&tf.depths)
        .filter_map(|(&p, &d)| {
            let (x, y) = to_scene(p, template.bbox(), window);
            scene_depth(scene, x, y).map(|s| s - d)
        })
        .collect();
    let mut sorted = offsets.clone();
    let Some(median) = median_f32(&mut sorted) else {
        return Check::fraction(0, tf.len(), cfg.t_match);
    };
    let band = cfg.depth_tolerance * template.diameter();
    let agreeing = offsets.iter().filter(|&&d| (d - median).abs() <= band).count();
    Check::fraction(agreeing, tf.len(), cfg.t_match)
}

/// Normalized HSV at stable points within the per-channel tolerance.
pub fn color(scene: &Scene, template: &Template, window: Rect, cfg: &VerifyConfig) -> Check {
    let tf = template.features();
    let agreeing = tf
        .stable_points
        .iter()
        .zip(&tf.colors)
        .filter(|&(&p, &c)| {
            let expected = normalize_hsv(c, &cfg.color_normalization);
            let (x, y) = to_scene(p, template.bbox(), window);
            neighbourhood_agrees(x, y, cfg.neighbourhood_radius, |sx, sy| {
                scene
                    .hsv()
                    .get_signed(sx, sy)
                    .map(|s| {
                        let seen = normalize_hsv(s, &cfg.color_normalization);
                        colors_agree(seen, expected, cfg.color_tolerance)
                    })
            })
        })
        .count();
    Check::fraction(agreeing, tf.len(), cfg.t_match)
}
