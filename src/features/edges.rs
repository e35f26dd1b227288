//! Edge and stable-point masks over a template's 8-bit intensity image.

use crate::image::filters::sobel3_i32;
use crate::image::Grid;

const TAN_22_5_X10K: i64 = 4142;
const TAN_67_5_X10K: i64 = 24142;

/// Canny-style edge mask of a pre-blurred 8-bit image.
///
/// L1 Sobel magnitude, non-maximum suppression along the gradient direction
/// quantized to four axes, then hysteresis between `low` and `high`.
pub fn canny(blurred: &Grid<u8>, low: f32, high: f32) -> Grid<bool> {
    let (width, height) = blurred.size();
    let (gx, gy) = sobel3_i32(blurred);
    let mut magnitude = blurred.map(|_| 0.0f32);
    for y in 0..height {
        for x in 0..width {
            magnitude.set(x, y, (gx.at(x, y).abs() + gy.at(x, y).abs()) as f32);
        }
    }

    let mag = |x: i64, y: i64| -> f32 { magnitude.get_signed(x, y).unwrap_or(0.0) };

    // 0: suppressed, 1: weak, 2: strong.
    let mut state = blurred.map(|_| 0u8);
    for y in 0..height {
        for x in 0..width {
            let m = magnitude.at(x, y);
            if m <= low {
                continue;
            }
            let dx = i64::from(gx.at(x, y));
            let dy = i64::from(gy.at(x, y));
            let (ax, ay) = (dx.abs(), dy.abs());
            let (xi, yi) = (x as i64, y as i64);
            let (prev, next) = if ay * 10_000 < ax * TAN_22_5_X10K {
                (mag(xi - 1, yi), mag(xi + 1, yi))
            } else if ay * 10_000 > ax * TAN_67_5_X10K {
                (mag(xi, yi - 1), mag(xi, yi + 1))
            } else if dx * dy > 0 {
                (mag(xi - 1, yi - 1), mag(xi + 1, yi + 1))
            } else {
                (mag(xi + 1, yi - 1), mag(xi - 1, yi + 1))
            };
            if m > prev && m >= next {
                state.set(x, y, if m >= high { 2 } else { 1 });
            }
        }
    }

    let mut stack: Vec<(usize, usize)> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if state.at(x, y) == 2 {
                stack.push((x, y));
            }
        }
    }
    while let Some((x, y)) = stack.pop() {
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                if state.at(nx, ny) == 1 {
                    state.set(nx, ny, 2);
                    stack.push((nx, ny));
                }
            }
        }
    }

    state.map(|s| s == 2)
}

/// Mask of "stable" pixels: bright enough to be on the object and flat
/// enough to be away from contours.
pub fn stable_mask(blurred: &Grid<u8>, grayscale_min: u8, sobel_max: u8) -> Grid<bool> {
    let (gx, gy) = sobel3_i32(blurred);
    let mut mask = blurred.map(|_| false);
    for y in 0..blurred.height() {
        for x in 0..blurred.width() {
            let response = ((gx.at(x, y).abs() + gy.at(x, y).abs()) / 2).min(255);
            let stable = blurred.at(x, y) > grayscale_min && response <= i32::from(sobel_max);
            mask.set(x, y, stable);
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::{canny, stable_mask};
    use crate::image::filters::box_blur3;
    use crate::image::Grid;

    fn square() -> Grid<u8> {
        Grid::from_fn(30, 30, |x, y| {
            if (10..20).contains(&x) && (10..20).contains(&y) {
                204
            } else {
                0
            }
        })
        .unwrap()
    }

    #[test]
    fn canny_traces_one_pixel_contour() {
        let edges = canny(&box_blur3(&square()), 100.0, 200.0);
        // Left contour sits on the background side, right contour on the object side.
        assert!(edges.at(9, 15));
        assert!(!edges.at(10, 15));
        assert!(edges.at(19, 15));
        assert!(!edges.at(20, 15));
        assert!(!edges.at(15, 15));
        assert!(!edges.at(2, 2));
    }

    #[test]
    fn stable_mask_keeps_flat_interior() {
        let mask = stable_mask(&box_blur3(&square()), 50, 50);
        assert!(mask.at(15, 15));
        assert!(!mask.at(11, 15));
        assert!(!mask.at(5, 5));
    }
}
