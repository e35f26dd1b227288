//! Synthetic RGB-D fixtures shared by the integration tests.
//!
//! The object is a 20x20 square whose depth ramps by one unit per column, so
//! it has a single, well-defined surface normal and sharp depth and
//! intensity contours.

#![allow(dead_code)]

use hashmatch::{DetectorConfig, Grid, Group, Hsv, Rect, Scene, TemplateSource};

pub const SIZE: usize = 50;
pub const SIDE: usize = 20;
pub const TEMPLATE_BBOX: Rect = Rect::new(15, 15, SIDE, SIDE);
pub const DIAMETER: f32 = 30.0;
pub const OBJECT_COLOR: Hsv = [60, 200, 200];
pub const BASE_DEPTH: f32 = 600.0;
pub const DEPTH_SCALE: f32 = 1.0 / 65536.0;

fn inside(x: usize, y: usize, ox: usize, oy: usize) -> bool {
    (ox..ox + SIDE).contains(&x) && (oy..oy + SIDE).contains(&y)
}

/// HSV, grayscale and raw depth of the square placed at `(ox, oy)`.
pub fn make_square(ox: usize, oy: usize) -> (Grid<Hsv>, Grid<f32>, Grid<f32>) {
    make_square_with(ox, oy, BASE_DEPTH, OBJECT_COLOR)
}

/// Like `make_square` with a custom base depth and color.
pub fn make_square_with(
    ox: usize,
    oy: usize,
    base_depth: f32,
    color: Hsv,
) -> (Grid<Hsv>, Grid<f32>, Grid<f32>) {
    let hsv = Grid::from_fn(SIZE, SIZE, |x, y| {
        if inside(x, y, ox, oy) {
            color
        } else {
            [0, 0, 0]
        }
    })
    .unwrap();
    let gray = Grid::from_fn(SIZE, SIZE, |x, y| if inside(x, y, ox, oy) { 0.8 } else { 0.0 })
        .unwrap();
    let depth = Grid::from_fn(SIZE, SIZE, |x, y| {
        if inside(x, y, ox, oy) {
            base_depth + (x - ox) as f32
        } else {
            0.0
        }
    })
    .unwrap();
    (hsv, gray, depth)
}

pub fn make_template(obj_id: u32) -> TemplateSource {
    let (hsv, gray, depth) = make_square(TEMPLATE_BBOX.x, TEMPLATE_BBOX.y);
    TemplateSource::new(obj_id, TEMPLATE_BBOX, DIAMETER, gray, hsv, depth).unwrap()
}

pub fn make_groups() -> Vec<Group> {
    vec![Group::new(1, vec![make_template(1)])]
}

/// Scene holding the square at `(ox, oy)`.
pub fn make_scene(ox: usize, oy: usize) -> Scene {
    let (hsv, gray, depth) = make_square(ox, oy);
    Scene::from_raw_depth(hsv, gray, depth, DEPTH_SCALE).unwrap()
}

/// Scene holding a square with custom base depth and color.
pub fn make_scene_with(ox: usize, oy: usize, base_depth: f32, color: Hsv) -> Scene {
    let (hsv, gray, depth) = make_square_with(ox, oy, base_depth, color);
    Scene::from_raw_depth(hsv, gray, depth, DEPTH_SCALE).unwrap()
}

/// Scene without any depth structure.
pub fn make_flat_scene(depth: f32) -> Scene {
    let hsv = Grid::filled(SIZE, SIZE, [0u8, 0, 0]).unwrap();
    let gray = Grid::filled(SIZE, SIZE, 0.0f32).unwrap();
    let depth = Grid::filled(SIZE, SIZE, depth).unwrap();
    Scene::from_raw_depth(hsv, gray, depth, DEPTH_SCALE).unwrap()
}

/// Default detector settings scaled down to the 20x20 object.
pub fn make_config() -> DetectorConfig {
    let mut cfg = DetectorConfig::default();
    cfg.features.feature_point_count = 20;
    cfg.objectness.depth_scale = DEPTH_SCALE;
    cfg
}

/// Template whose raw depth has sensor holes at `holes`.
pub fn make_template_with_holes(obj_id: u32, holes: &[(usize, usize)]) -> TemplateSource {
    let (hsv, gray, depth) = make_square(TEMPLATE_BBOX.x, TEMPLATE_BBOX.y);
    let depth = Grid::from_fn(SIZE, SIZE, |x, y| {
        if holes.contains(&(x, y)) {
            0.0
        } else {
            depth.get(x, y).unwrap_or(0.0)
        }
    })
    .unwrap();
    TemplateSource::new(obj_id, TEMPLATE_BBOX, DIAMETER, gray, hsv, depth).unwrap()
}

/// Template with intensity contours but one constant depth over the whole
/// render, so it has no depth edges at all.
pub fn make_flat_depth_template(obj_id: u32) -> TemplateSource {
    let (hsv, gray, _) = make_square(TEMPLATE_BBOX.x, TEMPLATE_BBOX.y);
    let depth = Grid::filled(SIZE, SIZE, BASE_DEPTH).unwrap();
    TemplateSource::new(obj_id, TEMPLATE_BBOX, DIAMETER, gray, hsv, depth).unwrap()
}
