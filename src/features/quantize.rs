//! Quantization of gradient orientations and surface normals into bins.
//!
//! Both quantizers are total functions: every input, including NaN and
//! infinities, maps to a valid bin so a bad pixel never poisons a hash key
//! or a verification score.

use crate::image::filters::central_difference;
use crate::image::Grid;
use crate::util::math::{finite_or, is_valid_depth};

/// Number of gradient-orientation bins covering [0, 180).
pub const ORIENTATION_BINS: u8 = 5;
/// Width of one orientation bin in degrees.
pub const ORIENTATION_BIN_DEG: i64 = 36;
/// Number of surface-normal bins.
pub const NORMAL_BINS: u8 = 8;
/// Sentinel for pixels without a usable measurement.
pub const INVALID_BIN: u8 = u8::MAX;

/// Polar angle of the normal reference cone (45 degrees).
const NORMAL_CONE_SIN: f32 = std::f32::consts::FRAC_1_SQRT_2;
const NORMAL_CONE_COS: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Gradient direction in degrees, in [0, 360).
pub fn gradient_orientation_deg(dx: f32, dy: f32) -> f32 {
    let deg = dy.atan2(dx).to_degrees();
    let deg = if deg < 0.0 { deg + 360.0 } else { deg };
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

/// Quantizes an orientation in degrees into one of five 36 degree bins.
///
/// Orientation is unsigned: the integer part of the angle is reduced modulo
/// 180, so `x` and `x + 180` share a bin. Bins are numbered by increasing
/// angle. Non-finite angles map to bin 0.
pub fn quantize_orientation(deg: f32) -> u8 {
    if !deg.is_finite() {
        return 0;
    }
    let whole = (deg.floor() as i64).rem_euclid(180);
    (whole / ORIENTATION_BIN_DEG) as u8
}

/// Unit surface normal from depth derivatives, facing the camera.
pub fn surface_normal(dzdx: f32, dzdy: f32) -> [f32; 3] {
    let nx = -finite_or(dzdx, 0.0);
    let ny = -finite_or(dzdy, 0.0);
    let norm = (nx * nx + ny * ny + 1.0).sqrt();
    [nx / norm, ny / norm, 1.0 / norm]
}

/// Reference direction for normal bin `k`: azimuth `k * 45` degrees on a
/// 45 degree cone around the viewing axis.
fn normal_reference(k: u8) -> [f32; 3] {
    let (sin, cos) = (f32::from(k) * std::f32::consts::FRAC_PI_4).sin_cos();
    [NORMAL_CONE_SIN * cos, NORMAL_CONE_SIN * sin, NORMAL_CONE_COS]
}

/// Quantizes a unit normal to the reference direction with the largest dot
/// product. Ties resolve to the lowest bin; NaN products count as -1.
pub fn quantize_normal(normal: [f32; 3]) -> u8 {
    let mut best_bin = 0u8;
    let mut best_dot = f32::NEG_INFINITY;
    for k in 0..NORMAL_BINS {
        let r = normal_reference(k);
        let dot = finite_or(normal[0] * r[0] + normal[1] * r[1] + normal[2] * r[2], -1.0);
        if dot > best_dot {
            best_dot = dot;
            best_bin = k;
        }
    }
    best_bin
}

/// Normal bin at `(x, y)` of a raw depth map.
///
/// Returns `None` when the pixel or any 4-neighbour is a depth hole or the
/// pixel lies on the border.
pub fn normal_bin_at(depth: &Grid<f32>, x: usize, y: usize) -> Option<u8> {
    let (dzdx, dzdy) = central_difference(depth, x, y)?;
    let neighbours = [
        depth.at(x, y),
        depth.at(x - 1, y),
        depth.at(x + 1, y),
        depth.at(x, y - 1),
        depth.at(x, y + 1),
    ];
    if !neighbours.iter().all(|&d| is_valid_depth(d)) {
        return None;
    }
    Some(quantize_normal(surface_normal(dzdx, dzdy)))
}

/// Orientation bin and gradient magnitude at `(x, y)` of a grayscale map.
pub fn gradient_at(gray: &Grid<f32>, x: usize, y: usize) -> Option<(u8, f32)> {
    let (dx, dy) = central_difference(gray, x, y)?;
    let magnitude = finite_or((dx * dx + dy * dy).sqrt(), 0.0);
    Some((quantize_orientation(gradient_orientation_deg(dx, dy)), magnitude))
}
